use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::StorageError;
use crate::store::ObjectStore;

/// Filesystem-backed [`ObjectStore`].
///
/// Each key becomes a file path relative to the root directory. Keys may
/// contain `/` to form a hierarchy; missing parent directories are created on
/// write. Existing files are overwritten.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key onto a path under the root.
    ///
    /// Only plain relative components are accepted, so a key can never
    /// escape the root directory.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        let rel = Path::new(key);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn save(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_owned(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &data).await.map_err(io_err)?;

        debug!(key, bytes = data.len(), path = %path.display(), "object saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.save("abc", Bytes::from_static(b"hello")).await.unwrap();

        let read = std::fs::read(dir.path().join("abc")).unwrap();
        assert_eq!(read, b"hello");
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("nested"));

        store
            .save("ab/cd/object-0", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(dir.path().join("nested/ab/cd/object-0").is_file());
    }

    #[tokio::test]
    async fn save_overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.save("k", Bytes::from_static(b"first")).await.unwrap();
        store.save("k", Bytes::from_static(b"2nd")).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("k")).unwrap(), b"2nd");
    }

    #[tokio::test]
    async fn save_empty_payload_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.save("empty", Bytes::new()).await.unwrap();

        assert_eq!(std::fs::metadata(dir.path().join("empty")).unwrap().len(), 0);
    }

    #[test]
    fn rejects_keys_escaping_root() {
        let store = LocalObjectStore::new("/tmp/store");
        for key in ["", "../etc/passwd", "/abs", "a/../../b", "./a"] {
            assert!(
                matches!(store.path_for(key), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn save_into_file_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"").unwrap();
        let store = LocalObjectStore::new(dir.path());

        let err = store
            .save("blocker/child", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        match err {
            StorageError::Io { key, .. } => assert_eq!(key, "blocker/child"),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
