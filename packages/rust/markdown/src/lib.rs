//! Markdown projection of acquired documents.
//!
//! Converts a [`Document`]'s extracted content HTML to Markdown via the
//! `htmd` crate, runs a cleanup pass pipeline, and prepends a provenance
//! header. The projection is deterministic: it carries no timestamps, so an
//! unchanged upstream page re-renders byte-identically across runs.

mod cleanup;

use tracing::debug;

use evidencer_shared::{Document, SegmentKind};

/// Render a document to its Markdown projection.
///
/// This is a pure projection with no failure path: if the HTML conversion
/// itself fails (a defect, not an expected condition), the plain segment text
/// is used instead.
pub fn render(document: &Document) -> String {
    let body = match convert_html(&document.content_html) {
        Ok(markdown) => markdown,
        Err(message) => {
            debug!(%message, "htmd conversion failed, falling back to segment text");
            segments_to_markdown(document)
        }
    };

    let cleaned = cleanup::run_pipeline(&body, Some(&document.source_url));
    let header = provenance_header(document);

    format!("{header}\n{cleaned}")
}

/// Convert content HTML to raw Markdown.
fn convert_html(html: &str) -> Result<String, String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    converter.convert(html).map_err(|e| e.to_string())
}

/// Deterministic YAML frontmatter identifying the snapshot.
///
/// Deliberately excludes the acquisition timestamp — that lives in
/// `metadata.json` — so identical content produces identical files.
fn provenance_header(document: &Document) -> String {
    let title = document
        .metadata
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Untitled");

    format!(
        "---\nsource: {}\ntitle: \"{}\"\ncontent_hash: {}\n---\n",
        document.source_url,
        title.replace('"', "'"),
        document.checksum,
    )
}

/// Last-resort rendering straight from the segment list.
fn segments_to_markdown(document: &Document) -> String {
    let mut out = String::new();
    for segment in &document.segments {
        match &segment.kind {
            SegmentKind::Heading { level } => {
                let hashes = "#".repeat((*level).clamp(1, 6) as usize);
                out.push_str(&format!("{hashes} {}\n\n", segment.text));
            }
            SegmentKind::Paragraph => {
                out.push_str(&segment.text);
                out.push_str("\n\n");
            }
            SegmentKind::ListItem => {
                out.push_str(&format!("- {}\n", segment.text));
            }
            SegmentKind::Code => {
                out.push_str(&format!("```\n{}\n```\n\n", segment.text));
            }
        }
    }
    out
}
