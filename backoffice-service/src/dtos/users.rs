use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::authz::Role;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub role: Role,

    /// Required when an unrestricted caller creates a scoped user;
    /// establishment-scoped callers always create users in their own
    /// establishment.
    pub establishment_id: Option<String>,
}
