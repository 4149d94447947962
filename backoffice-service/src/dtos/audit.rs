use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

/// Time-windowed audit query parameters. Queries are always bounded:
/// `since` defaults to the trailing 24 hours and `limit` is clamped
/// server-side.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditWindowParams {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuspiciousActivityParams {
    pub window_minutes: Option<i64>,
    pub threshold: Option<u64>,
}
