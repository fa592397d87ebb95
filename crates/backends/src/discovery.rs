//! Capability discovery — ranked probe chain over the `Backend` trait.
//!
//! Walks the configured preference order (most capable first) and returns
//! the first model that the credential is authorized for and that answers a
//! lightweight probe. Authorization and not-found class errors fall through
//! to the next candidate; the chain fails with `NoUsableBackend` only after
//! every ranked candidate has been exhausted. Discovery runs once per run —
//! the caller caches the result and never re-discovers mid-run.

use std::time::Duration;
use tracing::{info, warn};
use trendspotter_config::ModelPreference;
use trendspotter_core::backend::{Backend, CapabilityTier, ModelCapability};
use trendspotter_core::error::BackendError;

/// Discover a usable model for this run.
///
/// Each probe runs under its own bounded `timeout`; a probe timeout falls
/// through like an authorization error. A network failure aborts the chain
/// immediately — if the service is unreachable, later candidates cannot do
/// better.
pub async fn discover(
    backend: &dyn Backend,
    preferences: &[ModelPreference],
    timeout: Duration,
) -> Result<ModelCapability, BackendError> {
    let available = tokio::time::timeout(timeout, backend.list_models())
        .await
        .map_err(|_| BackendError::Timeout("model listing timed out".into()))??;

    info!(
        backend = backend.name(),
        available = available.len(),
        ranked = preferences.len(),
        "Scanning for a usable model"
    );

    let mut tried = Vec::new();

    for (i, pref) in preferences.iter().enumerate() {
        if !available.iter().any(|m| m == &pref.model) {
            warn!(
                model = %pref.model,
                rank = i + 1,
                "Candidate not authorized for this credential, trying next"
            );
            continue;
        }

        tried.push(pref.model.clone());
        match probe_candidate(backend, &pref.model, timeout).await {
            Ok(()) => {
                info!(model = %pref.model, tier = %pref.tier, "Capability discovered");
                return Ok(ModelCapability {
                    model: pref.model.clone(),
                    tier: pref.tier,
                });
            }
            Err(e) if e.is_fallthrough() => {
                warn!(model = %pref.model, error = %e, "Probe failed, trying next candidate");
            }
            Err(e) => return Err(e),
        }
    }

    // Terminal fallback: any other generation-capable gemini model, at the
    // legacy tier.
    for model in &available {
        if !model.contains("gemini") || tried.iter().any(|t| t == model) {
            continue;
        }
        match probe_candidate(backend, model, timeout).await {
            Ok(()) => {
                info!(model = %model, "Fallback capability discovered");
                return Ok(ModelCapability {
                    model: model.clone(),
                    tier: CapabilityTier::Legacy,
                });
            }
            Err(e) if e.is_fallthrough() => {
                warn!(model = %model, error = %e, "Fallback probe failed, trying next");
            }
            Err(e) => return Err(e),
        }
    }

    Err(BackendError::NoUsableBackend(format!(
        "all {} ranked candidates exhausted against backend '{}'",
        preferences.len(),
        backend.name()
    )))
}

async fn probe_candidate(
    backend: &dyn Backend,
    model: &str,
    timeout: Duration,
) -> Result<(), BackendError> {
    match tokio::time::timeout(timeout, backend.probe(model)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(format!(
            "probe of '{}' timed out after {}s",
            model,
            timeout.as_secs()
        ))),
    }
}
