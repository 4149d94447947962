use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use service_core::error::AppError;

use crate::authz::{AuthContext, Role};
use crate::dtos::establishments::{AssignUserRequest, CreateEstablishmentRequest};
use crate::models::{AccessAction, AccessLogEntry, Establishment};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Create an establishment (admin only)
#[utoipa::path(
    post,
    path = "/establishments",
    request_body = CreateEstablishmentRequest,
    responses(
        (status = 201, description = "Establishment created", body = Establishment),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Establishments",
    security(("bearer_auth" = []))
)]
pub async fn create_establishment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateEstablishmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let establishment = Establishment::new(req.name, req.address);
    state
        .db
        .establishments()
        .insert_one(&establishment, None)
        .await?;

    tracing::info!(establishment_id = %establishment.id, name = %establishment.name, "Establishment created");
    Ok((StatusCode::CREATED, Json(establishment)))
}

/// List all establishments (admin only)
#[utoipa::path(
    get,
    path = "/establishments",
    responses(
        (status = 200, description = "All establishments", body = [Establishment]),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Establishments",
    security(("bearer_auth" = []))
)]
pub async fn list_establishments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut cursor = state.db.establishments().find(doc! {}, None).await?;
    let mut establishments = Vec::new();
    while let Some(e) = cursor.try_next().await? {
        establishments.push(e);
    }
    Ok(Json(establishments))
}

/// Assign a user to an establishment
///
/// The bootstrap flow: reachable without an establishment guard so a
/// freshly created, not-yet-assigned manager can complete setup. Scoped
/// callers may only assign themselves; administrators may assign anyone.
#[utoipa::path(
    post,
    path = "/establishments/{id}/assign",
    params(("id" = String, Path, description = "Establishment id")),
    request_body = AssignUserRequest,
    responses(
        (status = 200, description = "User assigned"),
        (status = 403, description = "Assignment not permitted", body = ErrorResponse),
        (status = 404, description = "No such establishment or user", body = ErrorResponse)
    ),
    tag = "Establishments",
    security(("bearer_auth" = []))
)]
pub async fn assign_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(establishment_id): Path<String>,
    ValidatedJson(req): ValidatedJson<AssignUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Allow-list for the bootstrap exception: an unassigned manager may
    // assign only themselves. Anything else requires the unrestricted
    // role.
    let self_bootstrap = ctx.role() == Role::Manager
        && ctx.establishment_id().is_none()
        && req.user_id == ctx.user_id();

    if !ctx.can_access_all() && !self_bootstrap {
        state.audit.log_async(AccessLogEntry::decision(
            &ctx,
            AccessAction::Update,
            "user",
            req.user_id.clone(),
            Some(establishment_id.clone()),
            false,
            Some("assignment outside bootstrap allow-list".to_string()),
        ));
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "FORBIDDEN: cannot assign this user to an establishment"
        )));
    }

    let establishment = state
        .db
        .establishments()
        .find_one(doc! { "_id": &establishment_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Establishment not found")))?;

    if !establishment.active {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Establishment is inactive"
        )));
    }

    // Routed through the scope injector so the decision is audited; the
    // bootstrap caller has no establishment, so the filter passes through.
    let matched = state
        .users(&ctx)
        .update_one(
            doc! { "_id": &req.user_id },
            doc! { "$set": { "establishment_id": &establishment.id } },
        )
        .await?;

    if matched == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
    }

    tracing::info!(
        user_id = %req.user_id,
        establishment_id = %establishment.id,
        assigned_by = %ctx.user_id(),
        "User assigned to establishment"
    );
    Ok(Json(serde_json::json!({ "message": "User assigned" })))
}
