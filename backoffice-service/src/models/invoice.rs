use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ScopedResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Voided,
}

/// An invoice raised against a booking, owned by one establishment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub establishment_id: String,
    pub booking_id: String,
    /// Amount in minor currency units.
    #[schema(example = 12900)]
    pub amount_cents: i64,
    #[schema(example = "EUR")]
    pub currency: String,
    pub status: InvoiceStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(
        establishment_id: String,
        booking_id: String,
        amount_cents: i64,
        currency: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            establishment_id,
            booking_id,
            amount_cents,
            currency,
            status: InvoiceStatus::Draft,
            created_at: Utc::now(),
        }
    }
}

impl ScopedResource for Invoice {
    const RESOURCE_TYPE: &'static str = "invoice";

    fn resource_id(&self) -> String {
        self.id.clone()
    }

    fn establishment_id(&self) -> Option<&str> {
        Some(&self.establishment_id)
    }
}
