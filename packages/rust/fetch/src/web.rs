//! Network fetch and normalization of a single web resource.
//!
//! [`WebFetcher`] fetches one URL, computes a content checksum over the raw
//! body, extracts main content and segments, and exposes the result as an
//! immutable [`Document`].

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use url::Url;

use evidencer_shared::{AcquisitionTarget, Document, EvidencerError, Result};

use crate::extract::extract_content;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("Evidencer/", env!("CARGO_PKG_VERSION"));

/// Below this many characters of extracted text, a script-heavy page is
/// assumed to need JavaScript rendering.
const THIN_CONTENT_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The fetching collaborator the acquisition pipeline is built against.
///
/// `detect` must be consulted before `extract`; a backend only receives
/// targets it has declared itself capable of handling.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Whether this backend can handle the given target.
    fn detect(&self, target: &AcquisitionTarget) -> bool;

    /// Fetch and normalize the target into a [`Document`].
    ///
    /// No partial state is persisted on failure.
    async fn extract(&self, target: &AcquisitionTarget) -> Result<Document>;

    /// Pure markdown projection of an extracted document.
    ///
    /// There is no failure path: conversion defects fall back to the plain
    /// segment text.
    fn to_markdown(&self, document: &Document) -> String;

    /// Backend identifier for diagnostics.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// WebFetcher
// ---------------------------------------------------------------------------

/// Options for constructing a [`WebFetcher`].
#[derive(Debug, Clone)]
pub struct WebFetchOptions {
    /// Request the rendering-capable parser identity.
    pub enable_rendering: bool,
    /// HTTP timeout for the fetch.
    pub timeout: Duration,
}

impl Default for WebFetchOptions {
    fn default() -> Self {
        Self {
            enable_rendering: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP(S) fetcher for remote web content.
pub struct WebFetcher {
    client: Client,
    enable_rendering: bool,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl WebFetcher {
    /// Create a fetcher with the given options.
    pub fn new(options: WebFetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(options.timeout)
            .build()
            .map_err(|e| EvidencerError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            enable_rendering: options.enable_rendering,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    fn parser_name(&self) -> &'static str {
        if self.enable_rendering {
            "web-render-v1"
        } else {
            "web-static-v1"
        }
    }
}

#[async_trait]
impl ContentFetcher for WebFetcher {
    fn detect(&self, target: &AcquisitionTarget) -> bool {
        target.remote && matches!(target.source.scheme(), "http" | "https")
    }

    #[instrument(skip_all, fields(url = %target.source))]
    async fn extract(&self, target: &AcquisitionTarget) -> Result<Document> {
        let url = &target.source;

        if !self.allow_localhost && is_ssrf_target(url) {
            return Err(EvidencerError::Fetch(format!(
                "{url}: refusing to fetch private or local address"
            )));
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| EvidencerError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvidencerError::Fetch(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| EvidencerError::Fetch(format!("{url}: body read failed: {e}")))?;

        debug!(status = status.as_u16(), bytes = body.len(), "page fetched");

        let document = self.build_document(url, &body, status.as_u16(), content_type);

        if !document.warnings.is_empty() {
            warn!(
                warnings = document.warnings.len(),
                checksum = %document.checksum,
                "document extracted with warnings"
            );
        }

        Ok(document)
    }

    fn to_markdown(&self, document: &Document) -> String {
        evidencer_markdown::render(document)
    }

    fn name(&self) -> &str {
        self.parser_name()
    }
}

impl WebFetcher {
    /// Normalize a fetched body into a [`Document`]. Sync on purpose so no
    /// parsed HTML is held across await points.
    fn build_document(
        &self,
        url: &Url,
        body: &str,
        status: u16,
        content_type: Option<String>,
    ) -> Document {
        let checksum = compute_checksum(body);
        let extraction = extract_content(body);

        let mut warnings = Vec::new();
        if extraction.title.is_none() {
            warnings.push("document has no title".to_string());
        }
        if extraction.used_body_fallback {
            warnings.push("no main content element found, used <body>".to_string());
        }
        let text_len: usize = extraction.segments.iter().map(|s| s.text.len()).sum();
        if !self.enable_rendering && extraction.script_count > 0 && text_len < THIN_CONTENT_CHARS {
            warnings.push("page may require JavaScript rendering".to_string());
        }

        let mut metadata = serde_json::Map::new();
        if let Some(title) = &extraction.title {
            metadata.insert("title".into(), title.clone().into());
        }
        metadata.insert("status".into(), status.into());
        metadata.insert("content_length".into(), body.len().into());
        if let Some(content_type) = content_type {
            metadata.insert("content_type".into(), content_type.into());
        }
        metadata.insert("rendering".into(), self.enable_rendering.into());

        Document {
            checksum,
            content_html: extraction.content_html,
            segments: extraction.segments,
            parser_name: self.parser_name().to_string(),
            warnings,
            metadata,
            source_url: url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hex SHA-256 digest of the raw fetched content.
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost"
            || host.ends_with(".local")
            || host.ends_with(".internal")
        {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
