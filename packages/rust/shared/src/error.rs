//! Error types for Evidencer.
//!
//! Library crates use [`EvidencerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for panic reports and maps errors
//! to process exit codes via [`EvidencerError::exit_code`].

use std::path::PathBuf;

/// Top-level error type for all Evidencer operations.
#[derive(Debug, thiserror::Error)]
pub enum EvidencerError {
    /// The configured fetch backend cannot handle the given target.
    #[error("backend cannot handle target: {target}")]
    CapabilityMismatch { target: String },

    /// Fetch refused by an external content policy (firewall-style block).
    /// Detected heuristically from the failure message.
    #[error("fetch blocked by content policy: {0}")]
    BlockedByPolicy(String),

    /// Any other network or content failure during fetch.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Durable write of content or metadata failed.
    #[error("persist error: {0}")]
    Persist(String),

    /// The target source has no entry in the source registry.
    #[error("source not registered: {source_id}")]
    RegistryLookup { source_id: String },

    /// Persisting the updated registry entry failed.
    #[error("registry write error: {0}")]
    RegistryWrite(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EvidencerError>;

impl EvidencerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a capability-mismatch error for a target.
    pub fn capability(target: impl Into<String>) -> Self {
        Self::CapabilityMismatch {
            target: target.into(),
        }
    }

    /// Create a registry-lookup error for an unknown source.
    pub fn unknown_source(source: impl Into<String>) -> Self {
        Self::RegistryLookup {
            source_id: source.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure.
    ///
    /// Policy blocks get a distinct status so external automation can branch
    /// on "needs allowlisting" vs "broken".
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BlockedByPolicy(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EvidencerError::capability("file:///tmp/page.html");
        assert_eq!(
            err.to_string(),
            "backend cannot handle target: file:///tmp/page.html"
        );

        let err = EvidencerError::unknown_source("https://example.com");
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            EvidencerError::BlockedByPolicy("firewall".into()).exit_code(),
            2
        );
        assert_eq!(EvidencerError::Fetch("timeout".into()).exit_code(), 1);
        assert_eq!(EvidencerError::Persist("disk full".into()).exit_code(), 1);
        assert_eq!(
            EvidencerError::unknown_source("https://example.com").exit_code(),
            1
        );
        assert_eq!(
            EvidencerError::RegistryWrite("denied".into()).exit_code(),
            1
        );
    }
}
