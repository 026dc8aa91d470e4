//! Durable snapshot storage for acquired content.
//!
//! One capability — "durable put of (path, content, message)" — with two
//! backends selected once at startup:
//! - [`GithubStore`] when a remote client can be initialized
//! - [`LocalStore`] as the direct-filesystem fallback
//!
//! [`StorageTarget`] derives the domain-scoped snapshot paths.

mod github;
mod local;
mod target;

use async_trait::async_trait;

use evidencer_shared::Result;

pub use github::{GithubOptions, GithubStore};
pub use local::LocalStore;
pub use target::{CONTENT_FILE, METADATA_FILE, StorageTarget};

/// A durable key-value put of (path, content).
///
/// Writes are independent of each other; callers get no cross-file
/// atomicity. `message` is a human-readable commit message, ignored by
/// backends without commit semantics.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Durably write `content` at the repo-relative `path`, overwriting any
    /// prior version.
    async fn put(&self, path: &str, content: &str, message: &str) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}
