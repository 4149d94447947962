//! Access audit log service.
//!
//! Durable, append-only record of every authorization decision (allowed
//! and denied), with scoped read paths for investigation and a
//! violation-rate check for anomaly detection. Entries are written by the
//! authorization core at the point of decision; domain handlers never
//! write here directly.

use chrono::{DateTime, Duration, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::FindOptions;
use std::time::Duration as StdDuration;

use super::MongoDb;
use crate::models::AccessLogEntry;

/// Defaults for the suspicious-activity check, used when the config
/// leaves them unset.
pub const DEFAULT_SUSPICIOUS_WINDOW_MINUTES: i64 = 10;
pub const DEFAULT_SUSPICIOUS_THRESHOLD: u64 = 5;

#[derive(Clone)]
pub struct AccessAuditService {
    db: MongoDb,
}

impl AccessAuditService {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    /// Append one entry synchronously.
    pub async fn log(&self, entry: AccessLogEntry) -> Result<(), mongodb::error::Error> {
        if !entry.allowed {
            tracing::warn!(
                user_id = %entry.user_id,
                resource_type = %entry.resource_type,
                resource_id = %entry.resource_id,
                reason = ?entry.reason,
                "Access denied"
            );
        }
        self.db.access_logs().insert_one(&entry, None).await?;
        Ok(())
    }

    /// Append one entry without blocking the request path. A write
    /// failure is reported to operational logging and never to the
    /// caller.
    pub fn log_async(&self, entry: AccessLogEntry) {
        let db = self.db.clone();
        if !entry.allowed {
            tracing::warn!(
                user_id = %entry.user_id,
                resource_type = %entry.resource_type,
                resource_id = %entry.resource_id,
                reason = ?entry.reason,
                "Access denied"
            );
        }
        tokio::spawn(async move {
            if let Err(e) = db.access_logs().insert_one(&entry, None).await {
                tracing::error!(
                    error = %e,
                    user_id = %entry.user_id,
                    resource_type = %entry.resource_type,
                    "Failed to write access audit entry"
                );
            }
        });
    }

    /// Denied entries since `since`, newest first.
    pub async fn get_violations(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, mongodb::error::Error> {
        let filter = doc! {
            "allowed": false,
            "timestamp": { "$gte": BsonDateTime::from_chrono(since) },
        };
        self.find_entries(filter, limit).await
    }

    /// All decisions recorded for one user since `since`, newest first.
    pub async fn get_user_activity(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, mongodb::error::Error> {
        let filter = doc! {
            "user_id": user_id,
            "timestamp": { "$gte": BsonDateTime::from_chrono(since) },
        };
        self.find_entries(filter, limit).await
    }

    /// Access history of a single resource, newest first.
    pub async fn get_resource_access_history(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, mongodb::error::Error> {
        let filter = doc! {
            "resource_type": resource_type,
            "resource_id": resource_id,
        };
        self.find_entries(filter, limit).await
    }

    /// True when `user_id` accumulated at least `threshold` denials in the
    /// trailing `window_minutes`. Intended to drive a rate limit or alert,
    /// never to block the request it was computed for.
    pub async fn has_suspicious_activity(
        &self,
        user_id: &str,
        window_minutes: i64,
        threshold: u64,
    ) -> Result<bool, mongodb::error::Error> {
        let window_start = Utc::now() - Duration::minutes(window_minutes);
        let filter = doc! {
            "user_id": user_id,
            "allowed": false,
            "timestamp": { "$gte": BsonDateTime::from_chrono(window_start) },
        };
        let denials = self.db.access_logs().count_documents(filter, None).await?;
        Ok(denials >= threshold)
    }

    /// Delete entries older than the retention window. The only delete
    /// path into the audit log; owned by a background task.
    pub async fn sweep_retention(
        &self,
        retention_days: i64,
    ) -> Result<u64, mongodb::error::Error> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = self
            .db
            .access_logs()
            .delete_many(
                doc! { "timestamp": { "$lt": BsonDateTime::from_chrono(cutoff) } },
                None,
            )
            .await?;
        Ok(result.deleted_count)
    }

    async fn find_entries(
        &self,
        filter: mongodb::bson::Document,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, mongodb::error::Error> {
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit.clamp(1, 1000))
            .build();

        let mut cursor = self.db.access_logs().find(filter, options).await?;
        let mut entries = Vec::new();
        while let Some(entry) = cursor.try_next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Periodic retention sweep owned by the process lifecycle.
pub fn spawn_retention_sweeper(
    audit: AccessAuditService,
    retention_days: i64,
    interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match audit.sweep_retention(retention_days).await {
                Ok(0) => {}
                Ok(deleted) => {
                    tracing::info!(deleted, retention_days, "Audit retention sweep completed")
                }
                Err(e) => tracing::error!(error = %e, "Audit retention sweep failed"),
            }
        }
    })
}
