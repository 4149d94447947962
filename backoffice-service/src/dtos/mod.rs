pub mod audit;
pub mod auth;
pub mod bookings;
pub mod employees;
pub mod establishments;
pub mod invoices;
pub mod users;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
