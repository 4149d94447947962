use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::authz::{AuthContext, Principal};
use crate::services::{ServiceError, TokenKind};
use crate::AppState;

/// Cookie fallback for clients that do not send an Authorization header.
/// The core only ever sees the raw token string.
const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Pull the bearer token out of the Authorization header or the access
/// token cookie.
fn extract_bearer(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    from_header.or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
    })
}

/// Best-effort client address for audit entries.
pub fn client_ip(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());

    forwarded.or_else(|| {
        req.extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|axum::extract::ConnectInfo(addr)| addr.to_string())
    })
}

/// Middleware to require authentication.
///
/// Verifies the presented access token (rejecting malformed, wrong-kind,
/// expired and revoked tokens before any domain logic runs) and stores
/// the Principal plus a fresh AuthContext in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(&req)
        .ok_or_else(|| AppError::from(ServiceError::Unauthenticated))?;

    let principal = state
        .tokens
        .verify(&token, TokenKind::Access)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?;

    let ip_address = client_ip(&req);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let ctx = AuthContext::new(principal.clone()).with_request_meta(ip_address, user_agent);

    req.extensions_mut().insert(principal);
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated principal.
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<Principal>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Principal missing from request extensions"
            ))
        })?;

        Ok(CurrentUser(principal.clone()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Authorization context missing from request extensions"
            ))
        })
    }
}
