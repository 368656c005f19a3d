//! Optional read-through cache for single-record lookups.
//!
//! Values are stored as JSON strings so any backend that can hold text can
//! implement [`Cache`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store with the cache's default TTL.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Store with an explicit TTL. A zero TTL never expires.
    async fn set_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to decode cached value for {}", key))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context("Failed to encode cache value")?;
    cache.set(key, raw).await
}

// Expired entries are swept on write once the map grows past this.
const SWEEP_THRESHOLD: usize = 1024;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache with per-entry expiry.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    default_ttl: Duration,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless someone refreshed it meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_ttl(key, value, self.default_ttl).await
    }

    async fn set_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = if ttl.is_zero() { None } else { Some(now + ttl) };

        let mut entries = self.entries.write().await;
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, e| !e.is_expired(now));
        }
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("track:1", "\"a\"".to_string()).await.unwrap();
        assert_eq!(cache.get("track:1").await.unwrap().as_deref(), Some("\"a\""));

        cache.del("track:1").await.unwrap();
        assert_eq!(cache.get("track:1").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryCache::new(Duration::from_millis(30));
        cache.set("k", "v".to_string()).await.unwrap();
        cache
            .set_ttl("forever", "v".to_string(), Duration::ZERO)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.get("forever").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        set_json(&cache, "nums", &vec![1, 2, 3]).await.unwrap();
        let nums: Option<Vec<i32>> = get_json(&cache, "nums").await.unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = get_json(&cache, "other").await.unwrap();
        assert_eq!(missing, None);
    }
}
