use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::StorageError;
use crate::store::ObjectStore;

/// In-memory [`ObjectStore`] using `DashMap`. Suitable for development and
/// testing.
///
/// Besides the write path it exposes read-side helpers so callers can verify
/// what was stored, and can be configured to start failing after a number of
/// successful saves.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Bytes>,
    saves: AtomicUsize,
    fail_from: Option<usize>,
}

impl MemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose `n`-th save (1-based) and every save after it
    /// fail with [`StorageError::Backend`].
    pub fn failing_from(n: usize) -> Self {
        Self {
            fail_from: Some(n),
            ..Self::default()
        }
    }

    /// Return the object stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|v| v.value().clone())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of save calls received, including failed ones.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn save(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let call = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_from.is_some_and(|n| call >= n) {
            return Err(StorageError::Backend(format!("injected failure on save {call}")));
        }
        self.objects.insert(key.to_owned(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_get() {
        let store = MemoryObjectStore::new();
        store.save("a", Bytes::from_static(b"1")).await.unwrap();
        assert_eq!(store.get("a").unwrap(), Bytes::from_static(b"1"));
        assert!(store.get("b").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn save_overwrites() {
        let store = MemoryObjectStore::new();
        store.save("a", Bytes::from_static(b"1")).await.unwrap();
        store.save("a", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(store.get("a").unwrap(), Bytes::from_static(b"2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn failing_from_keeps_earlier_writes() {
        let store = MemoryObjectStore::failing_from(3);
        store.save("k0", Bytes::new()).await.unwrap();
        store.save("k1", Bytes::new()).await.unwrap();
        assert!(matches!(
            store.save("k2", Bytes::new()).await,
            Err(StorageError::Backend(_))
        ));
        assert!(store.save("k3", Bytes::new()).await.is_err());
        assert_eq!(store.keys(), vec!["k0".to_owned(), "k1".to_owned()]);
        assert_eq!(store.save_count(), 4);
    }

    #[test]
    fn new_store_is_empty() {
        let store = MemoryObjectStore::default();
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }
}
