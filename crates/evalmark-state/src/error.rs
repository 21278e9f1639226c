//! Error types for evalmark-state

use thiserror::Error;

/// Errors produced by key-value persistence backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key contains characters outside `[A-Za-z0-9._-]` or is empty
    #[error("invalid storage key: {key:?}")]
    InvalidKey { key: String },

    /// Stored blob could not be interpreted by the caller
    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Underlying filesystem failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_display_quotes_key() {
        let err = StorageError::InvalidKey {
            key: "../etc".to_string(),
        };
        assert!(err.to_string().contains("\"../etc\""));
    }

    #[test]
    fn corrupt_display_names_key_and_reason() {
        let err = StorageError::Corrupt {
            key: "benchmark-storage".to_string(),
            reason: "expected object".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("benchmark-storage"));
        assert!(msg.contains("expected object"));
    }
}
