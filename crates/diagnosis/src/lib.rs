//! Diagnosis engine for TrendSpotter.
//!
//! Two stages: [`ingest`] reads and cleans a CSV into immutable records,
//! validating the configured schema against the file's header; [`engine`]
//! aggregates per segment and picks the single worst performer under a
//! configured loss metric, with a documented total order for ties.

pub mod engine;
pub mod ingest;

pub use engine::{aggregate, diagnose};
pub use ingest::load_csv;
