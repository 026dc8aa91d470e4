//! Durable source registry.
//!
//! A flat, pretty-printed JSON document tracking every known source and its
//! acquisition history. The acquisition pipeline reads one entry, mutates
//! `last_content_hash` and `last_checked`, and writes it back; entry
//! creation belongs to the registry itself (`sources add`), never to
//! acquisition runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use evidencer_shared::{EvidencerError, REGISTRY_SCHEMA_VERSION, Result, SourceEntry};

/// On-disk structure of the registry file.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    schema_version: u32,
    sources: Vec<SourceEntry>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            schema_version: REGISTRY_SCHEMA_VERSION,
            sources: Vec::new(),
        }
    }
}

/// Handle to the registry file, loaded fully into memory.
///
/// No coordination with concurrent writers — last writer wins, callers
/// serialize runs per source externally if that matters.
#[derive(Debug)]
pub struct SourceRegistry {
    path: PathBuf,
    file: RegistryFile,
}

impl SourceRegistry {
    /// Open the registry at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| EvidencerError::io(&path, e))?;
            serde_json::from_str(&content).map_err(|e| {
                EvidencerError::RegistryWrite(format!(
                    "malformed registry at {}: {e}",
                    path.display()
                ))
            })?
        } else {
            debug!(path = %path.display(), "registry file not found, starting empty");
            RegistryFile::default()
        };

        Ok(Self { path, file })
    }

    /// Location of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered sources.
    pub fn list(&self) -> &[SourceEntry] {
        &self.file.sources
    }

    /// Look up an entry by source URL. Trailing-slash differences between
    /// the stored key and the query are ignored.
    pub fn get_source(&self, url: &str) -> Option<&SourceEntry> {
        self.file
            .sources
            .iter()
            .find(|entry| urls_match(&entry.url, url))
    }

    /// Register a new source. Fails if the URL is already registered.
    pub fn add_source(&mut self, entry: SourceEntry) -> Result<()> {
        if self.get_source(&entry.url).is_some() {
            return Err(EvidencerError::RegistryWrite(format!(
                "source already registered: {}",
                entry.url
            )));
        }

        info!(url = %entry.url, name = %entry.name, "registering source");
        self.file.sources.push(entry);
        self.persist()
    }

    /// Write back an updated entry, replacing the stored one with the same
    /// URL key, and persist the registry.
    ///
    /// Fails with a lookup error if the entry does not exist — acquisition
    /// runs must never grow the registry.
    pub fn save_source(&mut self, entry: SourceEntry) -> Result<()> {
        let slot = self
            .file
            .sources
            .iter_mut()
            .find(|existing| urls_match(&existing.url, &entry.url))
            .ok_or_else(|| EvidencerError::unknown_source(&entry.url))?;

        *slot = entry;
        self.persist()
    }

    /// Persist the whole registry file (pretty JSON, full rewrite).
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EvidencerError::RegistryWrite(format!("{}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(&self.file)
            .map_err(|e| EvidencerError::RegistryWrite(e.to_string()))?;

        std::fs::write(&self.path, content)
            .map_err(|e| EvidencerError::RegistryWrite(format!("{}: {e}", self.path.display())))
    }
}

/// URL key comparison, insensitive to a trailing slash.
fn urls_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
