//! User model - back-office accounts with an optional home establishment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Role, ScopedResource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    /// Absent for admins; absent for scoped users until they are assigned
    /// to an establishment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub establishment_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(
        email: String,
        name: String,
        password_hash: String,
        role: Role,
        establishment_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            password_hash,
            role,
            establishment_id,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// The principal this account authenticates as.
    pub fn principal(&self) -> crate::authz::Principal {
        crate::authz::Principal::new(self.id.clone(), self.role, self.establishment_id.clone())
    }

    /// Strip credential material for API responses.
    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            establishment_id: self.establishment_id.clone(),
            active: self.active,
            created_at: self.created_at,
        }
    }
}

impl ScopedResource for User {
    const RESOURCE_TYPE: &'static str = "user";

    fn resource_id(&self) -> String {
        self.id.clone()
    }

    fn establishment_id(&self) -> Option<&str> {
        self.establishment_id.as_deref()
    }
}

/// User representation without sensitive fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SanitizedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub establishment_id: Option<String>,
    pub active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
