//! JSON file implementation of the state repository.

use crate::paths::DuetPaths;
use crate::storage::{AtomicFile, FileFormat};
use async_trait::async_trait;
use duet_core::error::{DuetError, Result};
use duet_core::state::{StateDocument, StateRepository};
use std::path::PathBuf;
use std::sync::Arc;

/// Stores the state document in a single JSON file.
///
/// File operations are blocking and run on the blocking thread pool.
#[derive(Clone)]
pub struct JsonStateRepository {
    file: Arc<AtomicFile<StateDocument>>,
}

impl JsonStateRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::new(path, FileFormat::Json)),
        }
    }

    /// Repository at the default `state.json` location.
    pub fn from_paths(paths: &DuetPaths) -> Self {
        Self::new(paths.state_file())
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

#[async_trait]
impl StateRepository for JsonStateRepository {
    async fn load(&self) -> Result<Option<StateDocument>> {
        let file = Arc::clone(&self.file);
        let loaded = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| DuetError::internal(format!("State load task failed: {e}")))??;

        tracing::debug!(
            "[JsonStateRepository] Loaded state from {:?} (present: {})",
            self.file.path(),
            loaded.is_some()
        );
        Ok(loaded)
    }

    async fn save(&self, document: &StateDocument) -> Result<()> {
        let file = Arc::clone(&self.file);
        let document = document.clone();
        tokio::task::spawn_blocking(move || file.replace(&document))
            .await
            .map_err(|e| DuetError::internal(format!("State save task failed: {e}")))??;

        tracing::debug!("[JsonStateRepository] Saved state to {:?}", self.file.path());
        Ok(())
    }
}
