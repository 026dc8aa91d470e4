//! Direct-filesystem durable store.
//!
//! Fallback backend used when no remote client is available at startup.
//! Writes are unconditional overwrites; parent directories are created as
//! needed.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use evidencer_shared::{EvidencerError, Result};

use crate::DurableStore;

/// Writes snapshots straight into the project tree.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// A store rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DurableStore for LocalStore {
    async fn put(&self, path: &str, content: &str, _message: &str) -> Result<()> {
        let full = self.root.join(path);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EvidencerError::Persist(format!("{}: {e}", parent.display())))?;
        }

        tokio::fs::write(&full, content)
            .await
            .map_err(|e| EvidencerError::Persist(format!("{}: {e}", full.display())))?;

        debug!(path = %full.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    fn name(&self) -> &str {
        "local filesystem"
    }
}
