use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An establishment: the tenant unit that owns bookings, invoices and
/// payroll records. Not itself establishment-scoped - administration of
/// establishments is an unrestricted-role surface.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Establishment {
    #[serde(rename = "_id")]
    pub id: String,
    #[schema(example = "Hotel Bellevue")]
    pub name: String,
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Establishment {
    pub fn new(name: String, address: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            address,
            active: true,
            created_at: Utc::now(),
        }
    }
}
