//! Durable persistence for the trained classifier state.
//!
//! `save` is atomic: the state is written to a sibling temp file and renamed
//! over the destination, so a concurrent `load` never observes a
//! half-written file.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ModelStoreError;
use crate::triage::classifier::ClassifierState;

/// Persistence boundary for [`ClassifierState`].
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Load the persisted state, if any.
    async fn load(&self) -> Result<Option<ClassifierState>, ModelStoreError>;

    /// Atomically persist a state, replacing any previous one.
    async fn save(&self, state: &ClassifierState) -> Result<(), ModelStoreError>;
}

/// Filesystem store: one JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    path: PathBuf,
}

impl FsModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ModelStore for FsModelStore {
    async fn load(&self) -> Result<Option<ClassifierState>, ModelStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ModelStoreError::Io(e)),
        };
        let state = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), "Loaded classifier state");
        Ok(Some(state))
    }

    async fn save(&self, state: &ClassifierState) -> Result<(), ModelStoreError> {
        let bytes = serde_json::to_vec(state)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Persisted classifier state");
        Ok(())
    }
}
