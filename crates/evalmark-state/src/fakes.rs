//! In-memory fake for the storage trait (testing only)
//!
//! `MemoryKvStore` satisfies the [`KvStore`] contract without touching disk.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::storage_traits::*;

/// In-memory key-value store backed by a `HashMap<key, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    store: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let store = self.store.lock().unwrap();
        Ok(store.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let mut store = self.store.lock().unwrap();
        store.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut store = self.store.lock().unwrap();
        store.remove(key);
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let store = self.store.lock().unwrap();
        let mut keys: Vec<String> = store.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
