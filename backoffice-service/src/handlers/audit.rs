//! Audit query surface (admin only). Read-only, time-windowed; no
//! unbounded scans.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use service_core::error::AppError;

use crate::dtos::audit::{AuditWindowParams, SuspiciousActivityParams};
use crate::AppState;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_LIMIT: i64 = 100;

/// Denied access decisions, newest first
#[utoipa::path(
    get,
    path = "/audit/violations",
    params(AuditWindowParams),
    responses(
        (status = 200, description = "Denied decisions in the window", body = [AccessLogEntry]),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn get_violations(
    State(state): State<AppState>,
    Query(params): Query<AuditWindowParams>,
) -> Result<impl IntoResponse, AppError> {
    let since = params
        .since
        .unwrap_or_else(|| Utc::now() - Duration::hours(DEFAULT_WINDOW_HOURS));
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let entries = state.audit.get_violations(since, limit).await?;
    Ok(Json(entries))
}

/// One user's access decisions, newest first
#[utoipa::path(
    get,
    path = "/audit/users/{user_id}/activity",
    params(
        ("user_id" = String, Path, description = "User id"),
        AuditWindowParams
    ),
    responses(
        (status = 200, description = "Decisions recorded for the user", body = [AccessLogEntry]),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn get_user_activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AuditWindowParams>,
) -> Result<impl IntoResponse, AppError> {
    let since = params
        .since
        .unwrap_or_else(|| Utc::now() - Duration::hours(DEFAULT_WINDOW_HOURS));
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let entries = state.audit.get_user_activity(&user_id, since, limit).await?;
    Ok(Json(entries))
}

/// Access history of one resource, newest first
#[utoipa::path(
    get,
    path = "/audit/resources/{resource_type}/{resource_id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. booking"),
        ("resource_id" = String, Path, description = "Resource id"),
        AuditWindowParams
    ),
    responses(
        (status = 200, description = "Decisions recorded for the resource", body = [AccessLogEntry]),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn get_resource_access_history(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    Query(params): Query<AuditWindowParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let entries = state
        .audit
        .get_resource_access_history(&resource_type, &resource_id, limit)
        .await?;
    Ok(Json(entries))
}

/// Violation-rate check for one user
#[utoipa::path(
    get,
    path = "/audit/users/{user_id}/suspicious",
    params(
        ("user_id" = String, Path, description = "User id"),
        SuspiciousActivityParams
    ),
    responses(
        (status = 200, description = "Whether the user's denial rate crossed the threshold"),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn get_suspicious_activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<SuspiciousActivityParams>,
) -> Result<impl IntoResponse, AppError> {
    let window_minutes = params
        .window_minutes
        .unwrap_or(state.config.audit.suspicious_window_minutes);
    let threshold = params
        .threshold
        .unwrap_or(state.config.audit.suspicious_threshold);

    let suspicious = state
        .audit
        .has_suspicious_activity(&user_id, window_minutes, threshold)
        .await?;

    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "window_minutes": window_minutes,
        "threshold": threshold,
        "suspicious": suspicious,
    })))
}
