//! Route guards that bound the authorization context's edge cases.
//!
//! `require_establishment` confines the "unassigned scoped principal sees
//! everything" bootstrap state to the allow-listed bootstrap routes: every
//! data route sits behind this guard, so the pass-through semantics of
//! `apply_filter` are unreachable from arbitrary listing paths.
//!
//! `require_admin` gates the unrestricted-only surfaces (establishment
//! administration, audit queries); denials are audited like any other
//! authorization decision.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::authz::AuthContext;
use crate::models::{AccessAction, AccessLogEntry};
use crate::AppState;

/// Reject scoped principals that have not been assigned an establishment.
/// Runs after `auth_middleware`.
pub async fn require_establishment(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Authorization context missing from request extensions"
            ))
        })?;

    if !ctx.can_access_all() && ctx.establishment_id().is_none() {
        state.audit.log_async(AccessLogEntry::decision(
            &ctx,
            AccessAction::Read,
            "route",
            req.uri().path().to_string(),
            None,
            false,
            Some("principal has no establishment assigned".to_string()),
        ));
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "FORBIDDEN: no establishment assigned to this account"
        )));
    }

    Ok(next.run(req).await)
}

/// Reject principals whose role is not exempt from establishment scoping.
/// Runs after `auth_middleware`.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Authorization context missing from request extensions"
            ))
        })?;

    if !ctx.can_access_all() {
        state.audit.log_async(AccessLogEntry::decision(
            &ctx,
            AccessAction::Read,
            "route",
            req.uri().path().to_string(),
            None,
            false,
            Some("role lacks unrestricted access".to_string()),
        ));
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "FORBIDDEN: administrator role required"
        )));
    }

    Ok(next.run(req).await)
}
