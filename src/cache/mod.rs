//! Volatile key/value cache with per-key TTL.
//!
//! The cache memoizes authorization decisions and holds transient
//! password-reset state. It is shared and externally synchronized; callers
//! tolerate concurrent refreshes (last write wins) and staleness up to the
//! TTL window. A miss is always safe — lookups fall back to the durable
//! store.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Version prefix baked into every key so the layout can change without
/// poisoning old entries.
const KEY_SCHEMA_VERSION: &str = "v1";

/// Build a cache key from a namespace and its discriminators.
///
/// This is the single place keys are derived; call sites never format keys
/// by hand. Discriminators are percent-escaped so paths and emails cannot
/// collide with the `:` separator.
#[must_use]
pub fn cache_key(namespace: &str, discriminators: &[&str]) -> String {
    let mut key = format!("{KEY_SCHEMA_VERSION}:{namespace}");
    for part in discriminators {
        key.push(':');
        key.extend(url::form_urlencoded::byte_serialize(part.as_bytes()));
    }
    key
}

/// Byte-oriented cache contract. `get` distinguishes absence (`Ok(None)`)
/// from backend failure (`Err`).
#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
    async fn delete(&self, keys: &[&str]) -> Result<()>;
}

/// Fetch and JSON-decode a cached object.
///
/// # Errors
///
/// Returns an error on backend failure or when the cached bytes no longer
/// decode as `T`.
pub async fn get_object<T: DeserializeOwned>(
    cache: &dyn ObjectCache,
    key: &str,
) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// JSON-encode and store an object under `key` with the given TTL.
///
/// # Errors
///
/// Returns an error on serialization or backend failure.
pub async fn set_object<T: Serialize + Sync>(
    cache: &dyn ObjectCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, &bytes, ttl).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_joins_namespace_and_discriminators() {
        let key = cache_key("permission", &["/v1/users", "GET", "42"]);
        assert_eq!(key, "v1:permission:%2Fv1%2Fusers:GET:42");
    }

    #[test]
    fn cache_key_escapes_the_separator() {
        let plain = cache_key("reset-password", &["a:b@x.com"]);
        let tricky = cache_key("reset-password", &["a", "b@x.com"]);
        assert_ne!(plain, tricky);
    }

    #[test]
    fn cache_key_without_discriminators_is_just_the_namespace() {
        assert_eq!(cache_key("permission-modules", &[]), "v1:permission-modules");
    }
}
