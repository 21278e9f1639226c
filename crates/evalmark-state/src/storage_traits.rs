//! Storage trait definitions for evalmark
//!
//! The scoring core never touches storage directly. Callers load rubric and
//! history blobs through a [`KvStore`], hand the decoded values to the core,
//! and write the results back.
//!
//! The trait is async and backend-agnostic. An in-memory fake lives in the
//! `fakes` module and a directory-backed store in `fs_store`.

use async_trait::async_trait;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Validate a storage key.
///
/// Keys double as file names for [`crate::FsKvStore`], so they are restricted
/// to ASCII alphanumerics plus `.`, `_` and `-`, and may not start with `.`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Opaque key → bytes persistence.
///
/// Guarantees:
/// - `put(k, v)` followed by `get(k)` returns exactly `v`.
/// - `put` on an existing key replaces the value wholesale.
/// - `get` on an absent key returns `Ok(None)`, never an error.
/// - `delete` on an absent key is a no-op.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Remove `key`. No-op if absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List stored keys in ascending order.
    async fn keys(&self) -> StorageResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_store_names() {
        assert!(validate_key("benchmark-storage").is_ok());
        assert!(validate_key("evaluation_storage.v1").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        for key in ["", "../x", "a/b", ".hidden", "with space"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey { .. })),
                "{key:?} should be rejected"
            );
        }
    }
}
