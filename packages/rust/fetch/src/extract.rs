//! Main-content extraction and segmentation of fetched HTML.
//!
//! Readability heuristics locate the content area (`<main>`, `<article>`,
//! then `<body>` as a last resort), chrome elements are stripped, and the
//! remaining structure is flattened into an ordered segment list.

use scraper::{ElementRef, Html, Selector};

use evidencer_shared::{Segment, SegmentKind};

/// Result of extracting content from a raw HTML page.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Clean content HTML (nav/footer/chrome stripped).
    pub content_html: String,
    /// Page title, from the first `<h1>` or the `<title>` element.
    pub title: Option<String>,
    /// Ordered content segments.
    pub segments: Vec<Segment>,
    /// True when no dedicated content element was found and `<body>` was used.
    pub used_body_fallback: bool,
    /// Number of `<script>` elements in the full page, as a proxy for
    /// JavaScript-dependent content.
    pub script_count: usize,
}

/// Candidate selectors for the main content area, in priority order.
const CONTENT_SELECTORS: &[&str] = &["main", "article", r#"[role="main"]"#, ".content"];

/// Extract the main content of an HTML page.
pub fn extract_content(html: &str) -> Extraction {
    let doc = Html::parse_document(html);

    let script_sel = Selector::parse("script").unwrap();
    let script_count = doc.select(&script_sel).count();

    let title = extract_title(&doc);

    for sel_str in CONTENT_SELECTORS {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            return Extraction {
                content_html: strip_chrome(&el.inner_html()),
                title,
                segments: collect_segments(el),
                used_body_fallback: false,
                script_count,
            };
        }
    }

    let body_sel = Selector::parse("body").unwrap();
    if let Some(body) = doc.select(&body_sel).next() {
        return Extraction {
            content_html: strip_chrome(&body.inner_html()),
            title,
            segments: collect_segments(body),
            used_body_fallback: true,
            script_count,
        };
    }

    Extraction {
        content_html: String::new(),
        title,
        segments: Vec::new(),
        used_body_fallback: true,
        script_count,
    }
}

/// Page title: first `<h1>` text, falling back to `<title>`.
fn extract_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").unwrap();
    if let Some(el) = doc.select(&h1_sel).next() {
        let text = element_text(&el);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let title_sel = Selector::parse("title").unwrap();
    doc.select(&title_sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

/// Flatten a content element into ordered segments.
fn collect_segments(root: ElementRef<'_>) -> Vec<Segment> {
    let sel = Selector::parse("h1, h2, h3, h4, h5, h6, p, li, pre").unwrap();

    let mut segments = Vec::new();
    for el in root.select(&sel) {
        if let Some(segment) = segment_for(&el) {
            segments.push(segment);
        }
    }
    segments
}

/// Map one element to a segment, skipping empty text.
fn segment_for(el: &ElementRef<'_>) -> Option<Segment> {
    let text = element_text(el);
    if text.is_empty() {
        return None;
    }

    let kind = match el.value().name() {
        "p" => SegmentKind::Paragraph,
        "li" => SegmentKind::ListItem,
        "pre" => SegmentKind::Code,
        tag => {
            let level: u8 = tag[1..].parse().ok()?;
            SegmentKind::Heading { level }
        }
    };

    Some(Segment { kind, text })
}

/// Collapse an element's text nodes into a single trimmed string.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Strip common navigation/chrome elements from content HTML.
fn strip_chrome(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let chrome_sel =
        Selector::parse("nav, header, footer, aside, script, style, .sidebar, .nav").unwrap();

    let mut result = html.to_string();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        result = result.replace(&outer, "");
    }
    result
}
