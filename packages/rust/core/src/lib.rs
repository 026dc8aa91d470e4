//! The Evidencer acquisition pipeline.
//!
//! Composes the fetch, storage, and registry collaborators into the
//! one-shot fetch → persist → register run. See [`pipeline::acquire`].

pub mod pipeline;

pub use pipeline::{AcquireConfig, AcquireReport, ProgressReporter, SilentProgress, acquire};
