//! In-process cache backend for tests and single-node runs.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ObjectCache;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// TTL map guarded by an async mutex. Expired entries are dropped lazily on
/// reads and swept on writes, the same way transient login state is held.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{get_object, set_object};

    #[tokio::test(start_paused = true)]
    async fn set_get_delete_round_trip() -> Result<()> {
        let cache = MemoryCache::new();

        cache.set("k", b"value", Duration::from_secs(30)).await?;
        assert_eq!(cache.get("k").await?, Some(b"value".to_vec()));

        cache.delete(&["k", "missing"]).await?;
        assert_eq!(cache.get("k").await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_their_ttl() -> Result<()> {
        let cache = MemoryCache::new();
        cache.set("k", b"value", Duration::from_secs(30)).await?;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("k").await?.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k").await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_refreshes_the_ttl() -> Result<()> {
        let cache = MemoryCache::new();
        cache.set("k", b"one", Duration::from_secs(10)).await?;

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", b"two", Duration::from_secs(10)).await?;

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k").await?, Some(b"two".to_vec()));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn object_helpers_round_trip_json() -> Result<()> {
        let cache = MemoryCache::new();
        set_object(&cache, "pair", &(1u32, "two"), Duration::from_secs(5)).await?;

        let value: Option<(u32, String)> = get_object(&cache, "pair").await?;
        assert_eq!(value, Some((1, "two".to_string())));

        let missing: Option<(u32, String)> = get_object(&cache, "absent").await?;
        assert_eq!(missing, None);
        Ok(())
    }
}
