use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::BookingStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "Guest name is required"))]
    #[schema(example = "Ada Lovelace")]
    pub guest_name: String,

    #[validate(length(min = 1, message = "Accommodation is required"))]
    pub accommodation_id: String,

    #[schema(value_type = String, format = "date")]
    pub check_in: NaiveDate,

    #[schema(value_type = String, format = "date")]
    pub check_out: NaiveDate,

    /// Required for unrestricted callers; ignored for establishment-scoped
    /// callers, whose own establishment always applies.
    pub establishment_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookingListParams {
    pub status: Option<BookingStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}
