//! Error types for the TrendSpotter domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error variant so a fatal error always
//! names the stage it originated in.

use thiserror::Error;

/// The top-level error type for all TrendSpotter operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Diagnosis stage ---
    #[error("Diagnosis error: {0}")]
    Diagnosis(#[from] DiagnosisError),

    // --- Discovery / narrative stage ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Layout stage ---
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

/// Input and aggregation errors. Fatal: no partial report is produced and
/// no backend call is attempted after one of these.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("Dataset is empty — nothing to diagnose")]
    EmptyDataset,

    #[error("Column '{0}' is missing from the dataset schema")]
    UnknownMeasure(String),

    #[error("Row {row}, column '{column}': cannot parse '{value}' as a number")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Failed to read dataset: {0}")]
    Io(String),
}

/// Errors from the generative backend — discovery probes and narrative
/// calls. None of these are retried; a timeout counts as unavailability.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No usable backend: {0}")]
    NoUsableBackend(String),
}

impl BackendError {
    /// Whether discovery should fall through to the next ranked candidate
    /// rather than failing the run.
    pub fn is_fallthrough(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_)
                | Self::ModelNotFound(_)
                | Self::ApiError { .. }
                | Self::RateLimited { .. }
                | Self::Timeout(_)
        )
    }
}

/// Layout errors. Raised only after the automatic line-height shrink has
/// bottomed out at the minimum legible height.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Narrative does not fit: needs {required:.1}pt but only {available:.1}pt available at minimum line height")]
    Overflow { required: f32, available: f32 },

    #[error("Chart region leaves no room for text on the page")]
    NoTextRegion,
}
