//! Loading and saving the two application stores through a [`KvStore`].
//!
//! Each store is one JSON blob under a fixed key. A missing key loads as an
//! empty store; an unparseable blob is reported as
//! [`StorageError::Corrupt`] rather than silently replaced.

use evalmark_state::{KvStore, StorageError};
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::error::Result;
use crate::obs;
use crate::store::{BenchmarkStore, EvaluationStore};

/// Key holding the [`BenchmarkStore`].
pub const BENCHMARK_STORAGE_KEY: &str = "benchmark-storage";

/// Key holding the [`EvaluationStore`].
pub const EVALUATION_STORAGE_KEY: &str = "evaluation-storage";

/// Both stores, loaded together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub benchmarks: BenchmarkStore,
    pub evaluations: EvaluationStore,
}

impl Workspace {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            benchmarks: BenchmarkStore::new(),
            evaluations: EvaluationStore::with_config(config),
        }
    }
}

fn corrupt(key: &str, err: impl std::fmt::Display) -> StorageError {
    obs::emit_workspace_load_error(key, &err);
    StorageError::Corrupt {
        key: key.to_string(),
        reason: err.to_string(),
    }
}

async fn load_text(kv: &dyn KvStore, key: &str) -> Result<Option<String>> {
    match kv.get(key).await? {
        None => Ok(None),
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| corrupt(key, e).into()),
    }
}

/// Load both stores. Evaluation caps come from `config`.
pub async fn load_workspace(kv: &dyn KvStore, config: &EngineConfig) -> Result<Workspace> {
    let benchmarks = match load_text(kv, BENCHMARK_STORAGE_KEY).await? {
        Some(text) => BenchmarkStore::from_json(&text)
            .map_err(|e| corrupt(BENCHMARK_STORAGE_KEY, e))?,
        None => BenchmarkStore::new(),
    };
    let evaluations = match load_text(kv, EVALUATION_STORAGE_KEY).await? {
        Some(text) => EvaluationStore::from_json(&text, config)
            .map_err(|e| corrupt(EVALUATION_STORAGE_KEY, e))?,
        None => EvaluationStore::with_config(config),
    };

    debug!(
        rubrics = benchmarks.len(),
        snapshots = evaluations.history().len(),
        "workspace loaded"
    );
    Ok(Workspace {
        benchmarks,
        evaluations,
    })
}

/// Save both stores.
pub async fn save_workspace(kv: &dyn KvStore, workspace: &Workspace) -> Result<()> {
    kv.put(
        BENCHMARK_STORAGE_KEY,
        workspace.benchmarks.to_json()?.as_bytes(),
    )
    .await?;
    kv.put(
        EVALUATION_STORAGE_KEY,
        workspace.evaluations.to_json()?.as_bytes(),
    )
    .await?;
    debug!("workspace saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EvalmarkError;
    use evalmark_state::MemoryKvStore;

    #[tokio::test]
    async fn test_empty_store_loads_defaults() {
        let kv = MemoryKvStore::new();
        let ws = load_workspace(&kv, &EngineConfig::default())
            .await
            .expect("load");
        assert!(ws.benchmarks.is_empty());
        assert!(ws.evaluations.history().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_reported() {
        let kv = MemoryKvStore::new();
        kv.put(BENCHMARK_STORAGE_KEY, b"{not json").await.expect("put");
        let err = load_workspace(&kv, &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvalmarkError::Storage(StorageError::Corrupt { ref key, .. }) if key == BENCHMARK_STORAGE_KEY
        ));
    }
}
