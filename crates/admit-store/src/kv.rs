//! Key-value port
//!
//! The only seam through which persisted bytes are read or written. The
//! in-memory implementation stands in for browser-style session storage and
//! can emulate a quota so "storage full" paths are testable.

use crate::error::KvError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

/// Durable, session-scoped key-value medium
#[async_trait::async_trait]
pub trait KvPort: Send + Sync + Debug {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replace a value
    ///
    /// Either the new value is fully stored or the old one is left untouched.
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// Remove a value; removing an absent key succeeds
    async fn remove(&self, key: &str) -> Result<(), KvError>;
}

#[async_trait::async_trait]
impl<T: KvPort + ?Sized> KvPort for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        (**self).remove(key).await
    }
}

/// In-memory medium
///
/// Lives as long as the value does, which models one browser session.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
    quota_bytes: Option<usize>,
    /// Held across the quota check and the insert
    quota_guard: Mutex<()>,
}

impl MemoryKv {
    /// Create unbounded medium
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create medium that rejects writes beyond `quota_bytes` of stored values
    #[inline]
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes used by every value except `key`'s
    fn used_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key() != key)
            .map(|entry| entry.value().len())
            .sum()
    }
}

#[async_trait::async_trait]
impl KvPort for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        if let Some(limit) = self.quota_bytes {
            let _guard = self.quota_guard.lock();
            let needed = self.used_excluding(key) + value.len();
            if needed > limit {
                return Err(KvError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
            self.entries.insert(key.to_string(), value);
            return Ok(());
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("a").await.unwrap(), None);

        kv.set("a", "1".into()).await.unwrap();
        kv.set("a", "2".into()).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(kv.len(), 1);

        kv.remove("a").await.unwrap();
        kv.remove("a").await.unwrap();
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn quota_rejects_and_keeps_old_value() {
        let kv = MemoryKv::with_quota(8);
        kv.set("a", "1234".into()).await.unwrap();

        let err = kv.set("b", "123456".into()).await.unwrap_err();
        assert!(matches!(err, KvError::QuotaExceeded { needed: 10, limit: 8, .. }));
        assert_eq!(kv.get("b").await.unwrap(), None);

        // replacing a value only counts the new size
        kv.set("a", "12345678".into()).await.unwrap();
        let err = kv.set("a", "123456789".into()).await.unwrap_err();
        assert!(matches!(err, KvError::QuotaExceeded { .. }));
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("12345678"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_respect_quota() {
        let kv = Arc::new(MemoryKv::with_quota(10));
        let writes: Vec<_> = (0..8)
            .map(|i| {
                let kv = Arc::clone(&kv);
                tokio::spawn(async move { kv.set(&format!("k{i}"), "123456".into()).await })
            })
            .collect();

        let mut accepted = 0;
        for write in writes {
            if write.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test]
    async fn arc_forwards() {
        let kv = Arc::new(MemoryKv::new());
        let port: &dyn KvPort = &kv;
        port.set("k", "v".into()).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
