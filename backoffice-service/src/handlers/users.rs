use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mongodb::bson::doc;
use service_core::error::AppError;

use crate::authz::AuthContext;
use crate::dtos::users::CreateUserRequest;
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::ServiceError;
use crate::utils::{hash_password, Password, ValidatedJson};
use crate::AppState;

use super::resolve_establishment;

/// Current user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = SanitizedUser),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .users()
        .find_one(doc! { "_id": &principal.user_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(user.sanitized()))
}

/// Create a back-office account
///
/// Scoped managers create accounts inside their own establishment; only
/// administrators can create unrestricted or unassigned accounts (the
/// scope injector denies everything else at insert time).
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = SanitizedUser),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Email uniqueness is global, so this existence probe runs unscoped;
    // it exposes nothing beyond the conflict itself.
    if state
        .db
        .users()
        .find_one(doc! { "email": &req.email }, None)
        .await?
        .is_some()
    {
        return Err(AppError::from(ServiceError::Conflict(
            "Email already registered".to_string(),
        )));
    }

    // Unrestricted accounts carry no establishment; everyone else lands
    // in a concrete establishment.
    let establishment_id = if req.role.can_access_all() {
        None
    } else {
        Some(resolve_establishment(&ctx, req.establishment_id)?)
    };

    let password_hash = hash_password(&Password::new(req.password))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Password hashing error: {}", e)))?;

    let user = User::new(
        req.email,
        req.name,
        password_hash.into_string(),
        req.role,
        establishment_id,
    );

    state.users(&ctx).insert_one(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(user.sanitized())))
}
