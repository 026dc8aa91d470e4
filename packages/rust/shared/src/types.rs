//! Core domain types for the Evidencer acquisition pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Current schema version for the registry file format.
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// AcquisitionTarget
// ---------------------------------------------------------------------------

/// The resource a single pipeline run acquires. Constructed once per run.
#[derive(Debug, Clone)]
pub struct AcquisitionTarget {
    /// Source identifier.
    pub source: Url,
    /// Whether the target lives on the network (vs a local file).
    pub remote: bool,
}

impl AcquisitionTarget {
    /// A remote (network) target.
    pub fn remote(source: Url) -> Self {
        Self {
            source,
            remote: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Kind of a content segment extracted from the fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// A heading with its level (1–6).
    Heading { level: u8 },
    /// A paragraph of body text.
    Paragraph,
    /// A list item.
    ListItem,
    /// A preformatted code block.
    Code,
}

/// One unit of structured content, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Structural kind of this segment.
    pub kind: SegmentKind,
    /// Plain text content.
    pub text: String,
}

/// A normalized, content-addressed document produced by the fetcher.
///
/// Produced exactly once per run and treated as immutable thereafter.
/// The checksum is a digest of the raw fetched bytes, so identical upstream
/// content always yields the same checksum across runs.
#[derive(Debug, Clone)]
pub struct Document {
    /// Hex SHA-256 of the raw response body.
    pub checksum: String,
    /// Extracted main-content HTML (chrome stripped), used for the
    /// markdown projection.
    pub content_html: String,
    /// Ordered content segments.
    pub segments: Vec<Segment>,
    /// Identifier of the backend that produced this document.
    pub parser_name: String,
    /// Non-fatal diagnostics collected during extraction.
    pub warnings: Vec<String>,
    /// Free-form metadata (title, HTTP status, content length, ...).
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// The URL this document was fetched from.
    pub source_url: Url,
}

// ---------------------------------------------------------------------------
// MetadataEnvelope
// ---------------------------------------------------------------------------

/// The `metadata.json` structure written next to each content snapshot.
///
/// Write-once per run, never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEnvelope {
    /// Source identifier.
    pub source_url: String,
    /// When the content was acquired (UTC, ISO-8601).
    pub acquired_at: DateTime<Utc>,
    /// Content checksum of the fetched document.
    pub content_hash: String,
    /// Backend identifier that produced the document.
    pub parser: String,
    /// Number of content segments extracted.
    pub segments_count: usize,
    /// Passthrough of the document's free-form metadata.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl MetadataEnvelope {
    /// Build an envelope for `document`, stamped with the current UTC instant.
    pub fn for_document(document: &Document) -> Self {
        Self {
            source_url: document.source_url.to_string(),
            acquired_at: Utc::now(),
            content_hash: document.checksum.clone(),
            parser: document.parser_name.clone(),
            segments_count: document.segments.len(),
            metadata: document.metadata.clone(),
        }
    }

    /// Pretty-printed JSON representation for persistence.
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::EvidencerError::Conversion(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SourceEntry
// ---------------------------------------------------------------------------

/// A durable record tracking a known source, owned by the registry.
///
/// The acquisition pipeline only ever mutates `last_content_hash` and
/// `last_checked`; everything else belongs to the registry subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Human-readable name.
    pub name: String,
    /// Source identifier — the registry key.
    pub url: String,
    /// Source kind (currently always `web`).
    #[serde(default = "default_source_kind")]
    pub kind: String,
    /// When the entry was registered.
    pub added_at: DateTime<Utc>,
    /// Operator notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Checksum of the most recently acquired content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_content_hash: Option<String>,
    /// When the source was last successfully checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

fn default_source_kind() -> String {
    "web".into()
}

impl SourceEntry {
    /// Create a fresh entry with no acquisition history.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: default_source_kind(),
            added_at: Utc::now(),
            notes: None,
            last_content_hash: None,
            last_checked: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), "Denver Broncos".into());
        metadata.insert("status".into(), 200.into());

        Document {
            checksum: "abc123".into(),
            content_html: "<h1>Denver Broncos</h1><p>News.</p>".into(),
            segments: vec![
                Segment {
                    kind: SegmentKind::Heading { level: 1 },
                    text: "Denver Broncos".into(),
                },
                Segment {
                    kind: SegmentKind::Paragraph,
                    text: "News.".into(),
                },
            ],
            parser_name: "web-render-v1".into(),
            warnings: vec![],
            metadata,
            source_url: Url::parse("https://www.denverbroncos.com").unwrap(),
        }
    }

    #[test]
    fn envelope_copies_document_fields() {
        let doc = sample_document();
        let envelope = MetadataEnvelope::for_document(&doc);

        assert_eq!(envelope.source_url, "https://www.denverbroncos.com/");
        assert_eq!(envelope.content_hash, "abc123");
        assert_eq!(envelope.parser, "web-render-v1");
        assert_eq!(envelope.segments_count, 2);
        assert_eq!(
            envelope.metadata.get("title").and_then(|v| v.as_str()),
            Some("Denver Broncos")
        );
    }

    #[test]
    fn envelope_json_has_exact_field_names() {
        let envelope = MetadataEnvelope::for_document(&sample_document());
        let json = envelope.to_json_pretty().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let obj = value.as_object().expect("object");

        for field in [
            "source_url",
            "acquired_at",
            "content_hash",
            "parser",
            "segments_count",
            "metadata",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert_eq!(obj.len(), 6);
        assert!(obj["metadata"].is_object());
    }

    #[test]
    fn envelope_timestamp_is_utc_iso8601() {
        let envelope = MetadataEnvelope::for_document(&sample_document());
        let json = envelope.to_json_pretty().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let stamp = value["acquired_at"].as_str().expect("string timestamp");
        let parsed: DateTime<Utc> = stamp.parse().expect("ISO-8601 UTC");
        assert!(parsed <= Utc::now());
    }

    #[test]
    fn source_entry_roundtrip() {
        let mut entry = SourceEntry::new("broncos", "https://www.denverbroncos.com");
        entry.last_content_hash = Some("abc123".into());
        entry.last_checked = Some(Utc::now());

        let json = serde_json::to_string_pretty(&entry).expect("serialize");
        let parsed: SourceEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.name, "broncos");
        assert_eq!(parsed.kind, "web");
        assert_eq!(parsed.last_content_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn source_entry_optional_fields_omitted() {
        let entry = SourceEntry::new("broncos", "https://www.denverbroncos.com");
        let json = serde_json::to_string(&entry).expect("serialize");
        assert!(!json.contains("last_content_hash"));
        assert!(!json.contains("last_checked"));
        assert!(!json.contains("notes"));
    }
}
