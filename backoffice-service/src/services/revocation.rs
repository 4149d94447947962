//! Revocation store - the negative list consulted on every token verify.
//!
//! The store answers "is this exact token value currently revoked?" in
//! O(1) and self-cleans. Keys are SHA-256 digests of the raw token value,
//! so raw bearer material never lands in the backing store. Absence means
//! not revoked. The periodic sweep is an explicit task spawned by the
//! process lifecycle (`spawn_revocation_sweeper`), never a module-load
//! side effect.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Stable digest of a raw token value, used as the store key.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a token as revoked until `expires_at` (unix seconds).
    /// Revoking an already-expired token is a no-op.
    async fn add(&self, token: &str, expires_at: i64) -> Result<(), anyhow::Error>;

    /// Presence check only; a token absent from the store is not revoked.
    async fn is_revoked(&self, token: &str) -> Result<bool, anyhow::Error>;

    /// Drop entries whose natural expiry has passed. Returns the number
    /// of entries removed. Idempotent.
    async fn sweep(&self) -> Result<u64, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// In-process store for single-node deployments and tests. Bounded by the
/// sweep to currently-valid-but-revoked tokens only.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: DashMap<String, i64>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn add(&self, token: &str, expires_at: i64) -> Result<(), anyhow::Error> {
        if expires_at <= Utc::now().timestamp() {
            return Ok(());
        }
        self.entries.insert(token_digest(token), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, anyhow::Error> {
        Ok(self.entries.contains_key(&token_digest(token)))
    }

    async fn sweep(&self) -> Result<u64, anyhow::Error> {
        let now = Utc::now().timestamp();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - self.entries.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Redis-backed store for multi-node deployments. Redis key TTLs make the
/// sweep a no-op, and revocations survive process restarts.
#[derive(Clone)]
pub struct RedisRevocationStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisRevocationStore {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %url, "Connecting to Redis revocation store");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        Ok(Self {
            _client: client,
            manager,
        })
    }

    fn key(digest: &str) -> String {
        format!("revoked:{}", digest)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn add(&self, token: &str, expires_at: i64) -> Result<(), anyhow::Error> {
        let ttl = expires_at - Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(Self::key(&token_digest(token)))
            .arg("1")
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to record revocation: {}", e))
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(&token_digest(token)))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check revocation: {}", e))?;
        Ok(exists)
    }

    async fn sweep(&self) -> Result<u64, anyhow::Error> {
        // Redis expires keys itself.
        Ok(0)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// Periodic maintenance task owned by the process lifecycle. Runs until
/// the process shuts down.
pub fn spawn_revocation_sweeper(
    store: Arc<dyn RevocationStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.sweep().await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!(removed, "Revocation store sweep removed expired entries")
                }
                Err(e) => tracing::error!(error = %e, "Revocation store sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revoked_token_is_found_until_expiry() {
        let store = InMemoryRevocationStore::new();
        let expires_at = Utc::now().timestamp() + 60;

        store.add("token-a", expires_at).await.unwrap();
        assert!(store.is_revoked("token-a").await.unwrap());
        assert!(!store.is_revoked("token-b").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoking_expired_token_is_noop() {
        let store = InMemoryRevocationStore::new();
        store
            .add("stale", Utc::now().timestamp() - 1)
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = InMemoryRevocationStore::new();
        let expires_at = Utc::now().timestamp() + 60;
        store.add("token-a", expires_at).await.unwrap();
        store.add("token-a", expires_at).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_drops_only_expired_entries() {
        let store = InMemoryRevocationStore::new();
        let now = Utc::now().timestamp();
        store.add("live", now + 3600).await.unwrap();
        store.entries.insert(token_digest("dead"), now - 10);

        let removed = store.sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_revoked("live").await.unwrap());
        assert!(!store.is_revoked("dead").await.unwrap());
    }

    #[test]
    fn test_digest_is_stable_and_hides_token() {
        let digest = token_digest("secret-token");
        assert_eq!(digest, token_digest("secret-token"));
        assert_ne!(digest, "secret-token");
        assert_eq!(digest.len(), 64);
    }
}
