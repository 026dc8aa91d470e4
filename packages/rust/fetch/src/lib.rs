//! Web content fetching and normalization.
//!
//! This crate provides:
//! - [`ContentFetcher`] — the trait the acquisition pipeline is built against
//! - [`WebFetcher`] — HTTP(S) fetcher with checksumming and segmentation
//! - [`classify`] — heuristic classification of fetch failures (policy blocks)

pub mod classify;
pub mod extract;
pub mod web;

pub use classify::{FetchFailureKind, classify, refine};
pub use extract::{Extraction, extract_content};
pub use web::{ContentFetcher, WebFetchOptions, WebFetcher, compute_checksum};
