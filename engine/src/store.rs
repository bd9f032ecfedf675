//! Key/value cache used to memoize corpus stages across runs.
//!
//! The check-then-read-or-rebuild pattern built on top of this is best-effort:
//! two processes rebuilding at once may both write, last writer wins.

use crate::error::StoreError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

pub trait Store: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool, StoreError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn flush(&self) -> Result<(), StoreError> { Ok(()) }
}

/// bincode-decode a cached value. A missing key is `Ok(None)`.
pub fn get_value<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

pub fn set_value<T: Serialize + ?Sized>(store: &dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value)?;
    store.set(key, &bytes)
}

/// On-disk cache backed by sled. Open explicitly, close to flush.
pub struct SledStore {
    db: RwLock<Option<sled::Db>>,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened cache");
        Ok(Self { db: RwLock::new(Some(db)) })
    }

    /// Flush and release the database. Later calls fail with `StoreError::Closed`.
    pub fn close(&self) -> Result<(), StoreError> {
        if let Some(db) = self.db.write().take() {
            db.flush()?;
        }
        Ok(())
    }

    fn with_db<T>(&self, f: impl FnOnce(&sled::Db) -> Result<T, StoreError>) -> Result<T, StoreError> {
        match self.db.read().as_ref() {
            Some(db) => f(db),
            None => Err(StoreError::Closed),
        }
    }
}

impl Store for SledStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.with_db(|db| Ok(db.contains_key(key)?))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_db(|db| Ok(db.get(key)?.map(|v| v.to_vec())))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_db(|db| {
            db.insert(key, value)?;
            Ok(())
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.with_db(|db| {
            db.flush()?;
            Ok(())
        })
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(%err, "failed to flush cache on drop");
        }
    }
}

/// In-process cache; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.entries.read().len() }
    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

impl Store for MemoryStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_roundtrips_values() {
        let store = MemoryStore::new();
        assert!(!store.exists("k").unwrap());
        set_value(&store, "k", &vec![1u32, 2, 3]).unwrap();
        assert!(store.exists("k").unwrap());
        let v: Option<Vec<u32>> = get_value(&store, "k").unwrap();
        assert_eq!(v, Some(vec![1, 2, 3]));
        let missing: Option<Vec<u32>> = get_value(&store, "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn sled_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.set("documents", b"abc").unwrap();
            store.close().unwrap();
            assert!(matches!(store.get("documents"), Err(StoreError::Closed)));
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert!(store.exists("documents").unwrap());
        assert_eq!(store.get("documents").unwrap().as_deref(), Some(&b"abc"[..]));
    }
}
