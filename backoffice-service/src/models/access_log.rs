//! Access audit log entry - one record per authorization decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{AuthContext, Role};

/// The data operation an authorization decision was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    Read,
    Create,
    Update,
    Delete,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessAction::Read => "read",
            AccessAction::Create => "create",
            AccessAction::Update => "update",
            AccessAction::Delete => "delete",
        }
    }
}

/// Append-only record of a single authorization decision, allowed or
/// denied. Written by the authorization core at the point of decision,
/// never by domain handlers; immutable except for the retention sweep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessLogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_establishment_id: Option<String>,
    pub action: AccessAction,
    #[schema(example = "booking")]
    pub resource_type: String,
    /// Record id, or "*" for collection-level operations.
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_establishment_id: Option<String>,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AccessLogEntry {
    /// Resource id recorded for operations that target a whole collection
    /// rather than a single record.
    pub const COLLECTION_SCOPE: &'static str = "*";

    /// Build an entry from the context that made the decision. The entry
    /// reflects the actual outcome; it is never written speculatively.
    pub fn decision(
        ctx: &AuthContext,
        action: AccessAction,
        resource_type: &str,
        resource_id: impl Into<String>,
        resource_establishment_id: Option<String>,
        allowed: bool,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id: ctx.user_id().to_string(),
            user_role: ctx.role(),
            user_establishment_id: ctx.establishment_id().map(|s| s.to_string()),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.into(),
            resource_establishment_id,
            allowed,
            reason,
            ip_address: ctx.ip_address().map(|s| s.to_string()),
            user_agent: ctx.user_agent().map(|s| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Principal;

    #[test]
    fn test_denied_entry_carries_reason_and_request_meta() {
        let ctx = AuthContext::new(Principal::new(
            "user_1",
            Role::Staff,
            Some("E1".to_string()),
        ))
        .with_request_meta(Some("10.0.0.9".to_string()), Some("curl/8".to_string()));

        let entry = AccessLogEntry::decision(
            &ctx,
            AccessAction::Read,
            "booking",
            "b42",
            Some("E2".to_string()),
            false,
            Some("establishment mismatch".to_string()),
        );

        assert!(!entry.allowed);
        assert_eq!(entry.user_id, "user_1");
        assert_eq!(entry.user_establishment_id.as_deref(), Some("E1"));
        assert_eq!(entry.resource_establishment_id.as_deref(), Some("E2"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.9"));
        assert!(entry.reason.is_some());
    }
}
