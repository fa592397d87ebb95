//! # TrendSpotter Core
//!
//! Domain types, traits, and error definitions for the TrendSpotter
//! strict-context diagnosis pipeline. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! The generative backend is defined as a trait here; implementations live
//! in `trendspotter-backends`. Everything the narrative generator is allowed
//! to see is captured in [`ContextPayload`] — the rest of the dataset never
//! crosses that boundary.

pub mod backend;
pub mod error;
pub mod page;
pub mod payload;
pub mod record;
pub mod stats;

// Re-export key types at crate root for ergonomics
pub use backend::{Backend, CapabilityTier, GenerateRequest, GenerateResponse, ModelCapability};
pub use error::{BackendError, DiagnosisError, Error, LayoutError, Result};
pub use page::{ChartHandle, LayoutPlan, LinePlacement, PageDescription, Rect};
pub use payload::{ContextPayload, NarrativeResult, INCONCLUSIVE_SENTINEL};
pub use record::{Record, Schema};
pub use stats::{AggregateStat, DiagnosticResult, LossMetric};
