use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Position is required"))]
    #[schema(example = "receptionist")]
    pub position: String,

    #[validate(range(min = 0, message = "Salary must not be negative"))]
    pub salary_cents: i64,

    /// Required for unrestricted callers; ignored for establishment-scoped
    /// callers.
    pub establishment_id: Option<String>,
}
