use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ScopedResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

/// A guest booking, owned by one establishment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub establishment_id: String,
    #[schema(example = "Ada Lovelace")]
    pub guest_name: String,
    /// Accommodation (room/unit) reference within the establishment.
    pub accommodation_id: String,
    #[schema(value_type = String, format = "date")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        establishment_id: String,
        guest_name: String,
        accommodation_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            establishment_id,
            guest_name,
            accommodation_id,
            check_in,
            check_out,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

impl ScopedResource for Booking {
    const RESOURCE_TYPE: &'static str = "booking";

    fn resource_id(&self) -> String {
        self.id.clone()
    }

    fn establishment_id(&self) -> Option<&str> {
        Some(&self.establishment_id)
    }
}
