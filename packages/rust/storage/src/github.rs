//! GitHub contents-API durable store.
//!
//! Each `put` is a commit-like operation: look up the current blob SHA
//! (absent for new files), then PUT the new content with a commit message.
//! Conflict resolution beyond that is GitHub's responsibility — this store
//! treats the API as a black-box durable put.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use evidencer_shared::{EvidencerError, Result};

use crate::DurableStore;

/// User-Agent for API requests (GitHub requires one).
const USER_AGENT: &str = concat!("Evidencer/", env!("CARGO_PKG_VERSION"));

/// Connection settings for a [`GithubStore`].
///
/// Built by the caller from explicit configuration — this crate never reads
/// the process environment itself.
#[derive(Debug, Clone)]
pub struct GithubOptions {
    /// API token.
    pub token: String,
    /// Repository slug, `owner/repo`.
    pub repository: String,
    /// Branch commits are written to.
    pub branch: String,
    /// API base URL (overridable for tests and self-hosted instances).
    pub api_base: String,
}

/// Durable store backed by the GitHub contents API.
pub struct GithubStore {
    client: Client,
    options: GithubOptions,
}

/// Subset of the contents-API GET response we care about.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

impl GithubStore {
    /// Create a store for the given repository.
    pub fn new(options: GithubOptions) -> Result<Self> {
        if options.repository.split('/').count() != 2 {
            return Err(EvidencerError::config(format!(
                "invalid repository slug '{}': expected owner/repo",
                options.repository
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EvidencerError::Persist(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.repository,
            path
        )
    }

    /// Current blob SHA of `path` on the target branch, if the file exists.
    async fn current_sha(&self, path: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.contents_url(path))
            .bearer_auth(&self.options.token)
            .header("Accept", "application/vnd.github+json")
            .query(&[("ref", self.options.branch.as_str())])
            .send()
            .await
            .map_err(|e| EvidencerError::Persist(format!("{path}: lookup failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let contents: ContentsResponse = response
                    .json()
                    .await
                    .map_err(|e| EvidencerError::Persist(format!("{path}: bad response: {e}")))?;
                Ok(Some(contents.sha))
            }
            status => Err(EvidencerError::Persist(format!(
                "{path}: lookup returned HTTP {status}"
            ))),
        }
    }
}

#[async_trait]
impl DurableStore for GithubStore {
    #[instrument(skip_all, fields(path = %path))]
    async fn put(&self, path: &str, content: &str, message: &str) -> Result<()> {
        let sha = self.current_sha(path).await?;
        debug!(path, update = sha.is_some(), "committing file");

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.options.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = sha.into();
        }

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.options.token)
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EvidencerError::Persist(format!("{path}: commit failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EvidencerError::Persist(format!(
                "{path}: commit returned HTTP {status}: {detail}"
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "github"
    }
}
