//! evalmark-state: key-value persistence for evalmark
//!
//! The scoring core treats storage as an opaque collaborator. This crate
//! provides that collaborator: a small async [`KvStore`] trait, an in-memory
//! fake for tests, and a directory-backed store used by the CLI.
//!
//! ## Key Components
//!
//! - `KvStore`: get/put/delete/list of JSON blobs by key
//! - `MemoryKvStore`: `Mutex<HashMap>` fake
//! - `FsKvStore`: one file per key with atomic replace

mod error;
pub mod fakes;
mod fs_store;
pub mod storage_traits;

pub use error::StorageError;
pub use fakes::MemoryKvStore;
pub use fs_store::FsKvStore;
pub use storage_traits::{validate_key, KvStore, StorageResult};
