//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each pass is a function `&str -> String` applied in sequence. Passes must
//! be deterministic — the projection contract depends on it.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.to_string();

    result = demote_duplicate_h1(&result);
    result = fix_code_fence_languages(&result);
    result = strip_stray_tags(&result);
    result = absolutize_links(&result, base_url);
    result = collapse_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Keep the first H1, demote any later ones to H2.
fn demote_duplicate_h1(md: &str) -> String {
    let mut seen_h1 = false;
    let mut lines: Vec<String> = Vec::with_capacity(md.lines().count());

    for line in md.lines() {
        if let Some(rest) = line.strip_prefix("# ") {
            if seen_h1 {
                lines.push(format!("## {rest}"));
                continue;
            }
            seen_h1 = true;
        }
        lines.push(line.to_string());
    }

    lines.join("\n")
}

/// Rewrite class-style fence hints (`language-js`, `lang-py`, `highlight-rs`)
/// to plain language names.
fn fix_code_fence_languages(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    FENCE_RE.replace_all(md, "```$1").to_string()
}

/// Remove container tags that survived the conversion, outside code fences.
/// Inner text is preserved.
fn strip_stray_tags(md: &str) -> String {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|figure|figcaption|picture|source)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut out = String::with_capacity(md.len());
    let mut in_fence = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push_str(line);
        } else if in_fence {
            out.push_str(line);
        } else {
            out.push_str(&TAG_RE.replace_all(line, ""));
        }
        out.push('\n');
    }

    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Resolve relative Markdown link targets against the source URL.
fn absolutize_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures<'_>| {
            let target = &caps[1];
            if target.starts_with('#')
                || target.contains("://")
                || target.starts_with("mailto:")
            {
                return caps[0].to_string();
            }
            match base.join(target) {
                Ok(resolved) => format!("]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Collapse runs of 3+ blank lines into exactly one blank line.
fn collapse_blank_lines(md: &str) -> String {
    static BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    BLANK_RE.replace_all(md, "\n\n").to_string()
}

/// End the file with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}
