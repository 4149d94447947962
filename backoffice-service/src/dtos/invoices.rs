use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::InvoiceStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, message = "Booking reference is required"))]
    pub booking_id: String,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    #[schema(example = 12900)]
    pub amount_cents: i64,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    #[schema(example = "EUR")]
    pub currency: String,

    /// Required for unrestricted callers; ignored for establishment-scoped
    /// callers.
    pub establishment_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceListParams {
    pub status: Option<InvoiceStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}
