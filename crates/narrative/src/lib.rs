//! Strict-context prompt protocol for TrendSpotter.
//!
//! The narrative generator only ever sees a
//! [`ContextPayload`](trendspotter_core::ContextPayload); its response is
//! validated against that payload before anything reaches the page. A
//! response that cites a number the payload does not contain, or that breaks
//! the diagnose-then-prescribe structure, is absorbed into the refusal
//! sentinel rather than surfaced with contradicted numbers.

pub mod prompt;
pub mod validator;

use std::time::Duration;
use tracing::{info, warn};
use trendspotter_core::backend::{Backend, GenerateRequest, ModelCapability};
use trendspotter_core::error::BackendError;
use trendspotter_core::payload::{ContextPayload, NarrativeResult};

pub use prompt::build_prompt;
pub use validator::{validate, ValidationFailure};

/// Tunables for one narrative call.
#[derive(Debug, Clone)]
pub struct NarrativeOptions {
    /// Losses below this magnitude skip the backend call entirely.
    pub materiality_threshold: f64,

    /// Relative tolerance when matching response numbers to payload values.
    pub numeric_tolerance: f64,

    /// Sampling temperature.
    pub temperature: f32,

    /// Top-k sampling cutoff.
    pub top_k: u32,

    /// Longest narrative the layout contract is tested against. A longer
    /// response is absorbed into the sentinel like any other validation
    /// failure.
    pub max_narrative_chars: usize,

    /// Bound on the single backend call. A timeout is unavailability, not a
    /// validation failure, and is never retried.
    pub timeout: Duration,
}

impl Default for NarrativeOptions {
    fn default() -> Self {
        Self {
            materiality_threshold: 100.0,
            numeric_tolerance: 0.01,
            temperature: 0.7,
            top_k: 40,
            max_narrative_chars: 4000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Produce the narrative for one payload. Called exactly once per run.
///
/// Availability failures (network, auth, timeout) surface as `BackendError`;
/// guardrail validation failures are absorbed into
/// [`NarrativeResult::Inconclusive`] and the run continues.
pub async fn narrate(
    payload: &ContextPayload,
    capability: &ModelCapability,
    backend: &dyn Backend,
    opts: &NarrativeOptions,
) -> Result<NarrativeResult, BackendError> {
    // Immaterial losses never justify a network call.
    if payload.loss_magnitude < opts.materiality_threshold {
        info!(
            loss = payload.loss_magnitude,
            threshold = opts.materiality_threshold,
            "Loss below materiality threshold, emitting sentinel"
        );
        return Ok(NarrativeResult::Inconclusive);
    }

    let request = GenerateRequest {
        prompt: build_prompt(payload, opts.materiality_threshold),
        temperature: opts.temperature,
        top_k: opts.top_k,
        max_tokens: None,
    };

    let response = match tokio::time::timeout(
        opts.timeout,
        backend.generate(&capability.model, request),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(BackendError::Timeout(format!(
                "narrative call to '{}' timed out after {}s",
                capability.model,
                opts.timeout.as_secs()
            )));
        }
    };

    let cleaned = clean_markdown(&response.text);

    let chars = cleaned.chars().count();
    if chars > opts.max_narrative_chars {
        warn!(
            model = %capability.model,
            chars,
            limit = opts.max_narrative_chars,
            "Narrative exceeds the length bound, substituting sentinel"
        );
        return Ok(NarrativeResult::Inconclusive);
    }

    match validate(&cleaned, payload, opts.numeric_tolerance) {
        Ok(NarrativeResult::Inconclusive) => {
            info!(model = %capability.model, "Backend refused with the sentinel");
            Ok(NarrativeResult::Inconclusive)
        }
        Ok(result) => Ok(result),
        Err(failure) => {
            warn!(
                model = %capability.model,
                reason = %failure,
                "Narrative failed guardrail validation, substituting sentinel"
            );
            Ok(NarrativeResult::Inconclusive)
        }
    }
}

/// Strip the markdown the generator tends to emit; the layout engine places
/// plain text only.
fn clean_markdown(text: &str) -> String {
    text.replace("**", "").replace("##", "").trim().to_string()
}
