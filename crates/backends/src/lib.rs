//! Generative backend implementations for TrendSpotter.
//!
//! All backends implement the `trendspotter_core::Backend` trait. Capability
//! discovery walks a ranked candidate list against that trait and returns
//! the first model that probes clean.

pub mod discovery;
pub mod gemini;

pub use discovery::discover;
pub use gemini::GeminiBackend;
