use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::net::SocketAddr;

use crate::{
    dtos::auth::{LoginRequest, LogoutRequest, RefreshRequest},
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.login(req, addr.to_string()).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Logout: revoke whichever tokens are presented
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Tokens revoked")
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> impl IntoResponse {
    state
        .auth_service
        .logout(req.access_token, req.refresh_token)
        .await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Logged out successfully"
        })),
    )
}

/// Rotate a refresh token into a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = TokenResponse),
        (status = 401, description = "Refresh rejected with a reason code", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.refresh(req.refresh_token).await?;
    Ok((StatusCode::OK, Json(res)))
}
