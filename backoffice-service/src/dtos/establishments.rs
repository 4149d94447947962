use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEstablishmentRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Hotel Bellevue")]
    pub name: String,

    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignUserRequest {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
}
