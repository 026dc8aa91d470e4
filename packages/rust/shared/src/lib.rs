//! Shared types, error model, and configuration for Evidencer.
//!
//! This crate is the foundation depended on by all other Evidencer crates.
//! It provides:
//! - [`EvidencerError`] — the unified error type with exit-code mapping
//! - Domain types ([`AcquisitionTarget`], [`Document`], [`MetadataEnvelope`],
//!   [`SourceEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, GithubConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{EvidencerError, Result};
pub use types::{
    AcquisitionTarget, Document, MetadataEnvelope, REGISTRY_SCHEMA_VERSION, Segment, SegmentKind,
    SourceEntry,
};
