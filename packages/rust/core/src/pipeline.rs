//! End-to-end acquisition pipeline: fetch → persist → registry.
//!
//! Three stages run strictly in sequence with fail-fast semantics. There is
//! no rollback: a stage failure leaves earlier stages' writes in place, and
//! a later successful run self-heals the snapshot. The registry save is the
//! single point of run success.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument};
use url::Url;

use evidencer_fetch::{ContentFetcher, classify};
use evidencer_registry::SourceRegistry;
use evidencer_shared::{
    AcquisitionTarget, EvidencerError, MetadataEnvelope, Result,
};
use evidencer_storage::{DurableStore, StorageTarget};

// ---------------------------------------------------------------------------
// Config & report
// ---------------------------------------------------------------------------

/// Configuration for a single acquisition run.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Source to acquire.
    pub url: Url,
}

/// Summary of a completed acquisition run.
#[derive(Debug, Clone)]
pub struct AcquireReport {
    /// Network location the snapshot is namespaced under.
    pub domain: String,
    /// Snapshot directory relative to the project root.
    pub target_dir: String,
    /// Checksum of the acquired content.
    pub content_hash: String,
    /// Backend identifier that produced the document.
    pub parser: String,
    /// Number of extracted segments.
    pub segments: usize,
    /// Warnings surfaced during extraction.
    pub warnings: Vec<String>,
    /// Length of the stored markdown, in characters.
    pub markdown_chars: usize,
    /// Name of the store backend that persisted the snapshot.
    pub store: String,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called with a human-readable detail line.
    fn note(&self, line: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &AcquireReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn note(&self, _line: &str) {}
    fn done(&self, _report: &AcquireReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one acquisition against a single source.
///
/// 1. Capability check + fetch, with policy-block classification
/// 2. Persist `content.md` then `metadata.json` (sequential, no atomicity)
/// 3. Look up the registry entry (never auto-created) and record the new
///    content hash and check timestamp
#[instrument(skip_all, fields(url = %config.url))]
pub async fn acquire(
    config: &AcquireConfig,
    fetcher: &dyn ContentFetcher,
    store: &dyn DurableStore,
    registry: &mut SourceRegistry,
    progress: &dyn ProgressReporter,
) -> Result<AcquireReport> {
    let start = Instant::now();
    let target = AcquisitionTarget::remote(config.url.clone());

    // --- Stage 1: Fetch ---
    progress.phase("Fetching content");

    if !fetcher.detect(&target) {
        return Err(EvidencerError::capability(config.url.as_str()));
    }

    let document = fetcher.extract(&target).await.map_err(classify::refine)?;

    progress.note(&format!("checksum: {}", document.checksum));
    progress.note(&format!("segments: {}", document.segments.len()));
    progress.note(&format!("parser: {}", document.parser_name));
    for warning in &document.warnings {
        progress.note(&format!("warning: {warning}"));
    }

    let markdown = fetcher.to_markdown(&document);
    progress.note(&format!("markdown length: {} characters", markdown.len()));

    info!(
        checksum = %document.checksum,
        segments = document.segments.len(),
        warnings = document.warnings.len(),
        "content fetched"
    );

    // --- Stage 2: Persist snapshot ---
    progress.phase("Storing snapshot");

    let paths = StorageTarget::for_source(&config.url)?;
    let envelope = MetadataEnvelope::for_document(&document);
    let metadata_json = envelope.to_json_pretty()?;

    store
        .put(
            &paths.content_path,
            &markdown,
            &format!("Acquire content from {}", config.url),
        )
        .await?;
    progress.note(&format!("stored {}", paths.content_path));

    store
        .put(
            &paths.metadata_path,
            &metadata_json,
            &format!("Store metadata for {}", config.url),
        )
        .await?;
    progress.note(&format!("stored {}", paths.metadata_path));

    // --- Stage 3: Update registry ---
    progress.phase("Updating source registry");

    let mut entry = registry
        .get_source(config.url.as_str())
        .cloned()
        .ok_or_else(|| EvidencerError::unknown_source(config.url.as_str()))?;

    entry.last_content_hash = Some(document.checksum.clone());
    entry.last_checked = Some(Utc::now());
    registry.save_source(entry)?;

    let report = AcquireReport {
        domain: paths.domain,
        target_dir: paths.dir,
        content_hash: document.checksum,
        parser: document.parser_name,
        segments: document.segments.len(),
        warnings: document.warnings,
        markdown_chars: markdown.chars().count(),
        store: store.name().to_string(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        domain = %report.domain,
        content_hash = %report.content_hash,
        store = %report.store,
        elapsed_ms = report.elapsed.as_millis(),
        "acquisition complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use evidencer_shared::{Document, Segment, SegmentKind, SourceEntry};

    const SOURCE: &str = "https://www.denverbroncos.com/";

    fn source_url() -> Url {
        Url::parse(SOURCE).unwrap()
    }

    fn sample_document() -> Document {
        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), "Denver Broncos".into());

        Document {
            checksum: "abc123def456".into(),
            content_html: "<h1>Denver Broncos</h1>".into(),
            segments: vec![
                Segment {
                    kind: SegmentKind::Heading { level: 1 },
                    text: "Denver Broncos".into(),
                },
                Segment {
                    kind: SegmentKind::Paragraph,
                    text: "News.".into(),
                },
                Segment {
                    kind: SegmentKind::Paragraph,
                    text: "Scores.".into(),
                },
            ],
            parser_name: "web-render-v1".into(),
            warnings: vec![],
            metadata,
            source_url: source_url(),
        }
    }

    /// Fetcher returning a canned outcome; markdown is a plain projection of
    /// the segment text so runs are deterministic.
    struct StubFetcher {
        capable: bool,
        outcome: std::result::Result<Document, String>,
    }

    impl StubFetcher {
        fn ok() -> Self {
            Self {
                capable: true,
                outcome: Ok(sample_document()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                capable: true,
                outcome: Err(message.to_string()),
            }
        }

        fn incapable() -> Self {
            Self {
                capable: false,
                outcome: Err("unused".into()),
            }
        }
    }

    #[async_trait]
    impl ContentFetcher for StubFetcher {
        fn detect(&self, _target: &AcquisitionTarget) -> bool {
            self.capable
        }

        async fn extract(&self, _target: &AcquisitionTarget) -> Result<Document> {
            self.outcome
                .clone()
                .map_err(EvidencerError::Fetch)
        }

        fn to_markdown(&self, document: &Document) -> String {
            document
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Store recording every write; optionally fails from the nth put on.
    struct RecordingStore {
        writes: Mutex<Vec<(String, String, String)>>,
        fail_from: Option<usize>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                fail_from: None,
            }
        }

        fn failing_from(index: usize) -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                fail_from: Some(index),
            }
        }

        fn writes(&self) -> Vec<(String, String, String)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DurableStore for RecordingStore {
        async fn put(&self, path: &str, content: &str, message: &str) -> Result<()> {
            let mut writes = self.writes.lock().unwrap();
            if let Some(fail_from) = self.fail_from {
                if writes.len() >= fail_from {
                    return Err(EvidencerError::Persist(format!("{path}: injected failure")));
                }
            }
            writes.push((path.into(), content.into(), message.into()));
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn registry_with_entry(dir: &tempfile::TempDir) -> SourceRegistry {
        let mut registry =
            SourceRegistry::open(dir.path().join("registry/sources.json")).unwrap();
        registry
            .add_source(SourceEntry::new("broncos", SOURCE))
            .unwrap();
        registry
    }

    fn config() -> AcquireConfig {
        AcquireConfig { url: source_url() }
    }

    #[tokio::test]
    async fn successful_run_writes_snapshot_and_updates_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);
        let store = RecordingStore::new();

        let report = acquire(
            &config(),
            &StubFetcher::ok(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap();

        // Both files, in order, under the domain-scoped directory
        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0].0,
            "evidence/parsed/www.denverbroncos.com/content.md"
        );
        assert_eq!(
            writes[1].0,
            "evidence/parsed/www.denverbroncos.com/metadata.json"
        );
        assert_eq!(writes[0].2, format!("Acquire content from {SOURCE}"));
        assert_eq!(writes[1].2, format!("Store metadata for {SOURCE}"));

        // Envelope fields flow through exactly
        let metadata: serde_json::Value = serde_json::from_str(&writes[1].1).unwrap();
        assert_eq!(metadata["source_url"], SOURCE);
        assert_eq!(metadata["content_hash"], "abc123def456");
        assert_eq!(metadata["parser"], "web-render-v1");
        assert_eq!(metadata["segments_count"], 3);
        assert_eq!(metadata["metadata"]["title"], "Denver Broncos");

        // Registry reflects the run
        let entry = registry.get_source(SOURCE).unwrap();
        assert_eq!(entry.last_content_hash.as_deref(), Some("abc123def456"));
        assert!(entry.last_checked.is_some());

        assert_eq!(report.domain, "www.denverbroncos.com");
        assert_eq!(report.segments, 3);
        assert_eq!(report.parser, "web-render-v1");
    }

    #[tokio::test]
    async fn capability_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);
        let store = RecordingStore::new();

        let err = acquire(
            &config(),
            &StubFetcher::incapable(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvidencerError::CapabilityMismatch { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(store.writes().is_empty());
        assert!(registry.get_source(SOURCE).unwrap().last_checked.is_none());
    }

    #[tokio::test]
    async fn firewall_failure_maps_to_policy_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);
        let store = RecordingStore::new();

        let err = acquire(
            &config(),
            &StubFetcher::failing("domain rejected by Firewall allowlist"),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvidencerError::BlockedByPolicy(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(store.writes().is_empty());
        assert!(registry.get_source(SOURCE).unwrap().last_checked.is_none());
    }

    #[tokio::test]
    async fn generic_fetch_failure_stays_generic() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);
        let store = RecordingStore::new();

        let err = acquire(
            &config(),
            &StubFetcher::failing("connection timed out"),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvidencerError::Fetch(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn unknown_source_fails_and_leaves_registry_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let registry_path = dir.path().join("registry/sources.json");
        let mut registry = SourceRegistry::open(&registry_path).unwrap();
        let store = RecordingStore::new();

        let err = acquire(
            &config(),
            &StubFetcher::ok(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvidencerError::RegistryLookup { .. }));
        // No save occurred: the registry file was never created
        assert!(!registry_path.exists());
    }

    #[tokio::test]
    async fn metadata_write_failure_keeps_content_and_stale_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);

        let mut entry = registry.get_source(SOURCE).unwrap().clone();
        entry.last_content_hash = Some("old-hash".into());
        registry.save_source(entry).unwrap();

        // First put (content.md) succeeds, second (metadata.json) fails
        let store = RecordingStore::failing_from(1);

        let err = acquire(
            &config(),
            &StubFetcher::ok(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvidencerError::Persist(_)));
        assert_eq!(err.exit_code(), 1);

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.ends_with("content.md"));

        // Registry still reflects the pre-run state
        let entry = registry.get_source(SOURCE).unwrap();
        assert_eq!(entry.last_content_hash.as_deref(), Some("old-hash"));
    }

    #[tokio::test]
    async fn rerun_of_unchanged_content_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with_entry(&dir);
        let store = RecordingStore::new();

        acquire(
            &config(),
            &StubFetcher::ok(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap();
        let first_checked = registry.get_source(SOURCE).unwrap().last_checked.unwrap();

        acquire(
            &config(),
            &StubFetcher::ok(),
            &store,
            &mut registry,
            &SilentProgress,
        )
        .await
        .unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 4);
        // Same paths, identical markdown across runs
        assert_eq!(writes[0].0, writes[2].0);
        assert_eq!(writes[0].1, writes[2].1);

        // Hash fields identical, timestamps advance
        let first_meta: serde_json::Value = serde_json::from_str(&writes[1].1).unwrap();
        let second_meta: serde_json::Value = serde_json::from_str(&writes[3].1).unwrap();
        assert_eq!(first_meta["content_hash"], second_meta["content_hash"]);
        assert_eq!(first_meta["parser"], second_meta["parser"]);
        assert_eq!(first_meta["segments_count"], second_meta["segments_count"]);

        let entry = registry.get_source(SOURCE).unwrap();
        assert_eq!(entry.last_content_hash.as_deref(), Some("abc123def456"));
        assert!(entry.last_checked.unwrap() >= first_checked);
    }
}
