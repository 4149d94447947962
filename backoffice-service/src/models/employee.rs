use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ScopedResource;

/// A payroll/HR record, owned by one establishment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub establishment_id: String,
    pub name: String,
    #[schema(example = "receptionist")]
    pub position: String,
    /// Monthly salary in minor currency units.
    pub salary_cents: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub hired_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(
        establishment_id: String,
        name: String,
        position: String,
        salary_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            establishment_id,
            name,
            position,
            salary_cents,
            hired_at: Utc::now(),
        }
    }
}

impl ScopedResource for Employee {
    const RESOURCE_TYPE: &'static str = "employee";

    fn resource_id(&self) -> String {
        self.id.clone()
    }

    fn establishment_id(&self) -> Option<&str> {
        Some(&self.establishment_id)
    }
}
