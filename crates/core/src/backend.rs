//! Backend trait — the abstraction over generative-language services.
//!
//! A Backend knows how to list the models a credential is authorized to use,
//! probe one with a lightweight capability check, and run a single
//! prompt-in / text-out generation. Discovery walks a ranked candidate list
//! against this interface and returns the first model that probes clean —
//! no reflection, just an ordered fallback loop over the trait.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability tier of a discovered model, most capable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    /// Best reasoning quality.
    High,
    /// Fast, good-enough quality.
    Standard,
    /// Older models kept for compatibility.
    Legacy,
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Standard => f.write_str("standard"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// A discovered backend model plus its capability tier.
///
/// Queried once per run, cached in the run context for the run's duration,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapability {
    /// Fully-qualified model identifier (e.g. "models/gemini-1.5-pro").
    pub model: String,

    /// The tier the model was ranked at.
    pub tier: CapabilityTier,
}

/// A single generation request. One prompt in, one text out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The full prompt, including the strict-context directive.
    pub prompt: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Maximum output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_k() -> u32 {
    40
}

impl GenerateRequest {
    /// A request with the default generation config (temperature 0.7,
    /// top_k 40 — balances variety with professional consistency).
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            max_tokens: None,
        }
    }
}

/// A complete generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text.
    pub text: String,

    /// Which model actually responded.
    pub model: String,
}

/// The generative backend interface.
///
/// The pipeline calls `probe()` during discovery and `generate()` exactly
/// once per run, without knowing which concrete service is behind the trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend (e.g. "gemini").
    fn name(&self) -> &str;

    /// List the model identifiers the credential is authorized to use.
    async fn list_models(&self) -> std::result::Result<Vec<String>, BackendError>;

    /// Lightweight capability probe: does this model accept a generation
    /// request under this credential?
    async fn probe(&self, model: &str) -> std::result::Result<(), BackendError>;

    /// Run one generation against a specific model.
    async fn generate(
        &self,
        model: &str,
        request: GenerateRequest,
    ) -> std::result::Result<GenerateResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_most_capable_first() {
        assert!(CapabilityTier::High < CapabilityTier::Standard);
        assert!(CapabilityTier::Standard < CapabilityTier::Legacy);
    }

    #[test]
    fn tier_display() {
        assert_eq!(CapabilityTier::High.to_string(), "high");
        assert_eq!(CapabilityTier::Legacy.to_string(), "legacy");
    }

    #[test]
    fn request_defaults() {
        let req = GenerateRequest::new("diagnose this");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.top_k, 40);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn capability_serialization() {
        let cap = ModelCapability {
            model: "models/gemini-1.5-pro".into(),
            tier: CapabilityTier::High,
        };
        let json = serde_json::to_string(&cap).unwrap();
        assert!(json.contains("gemini-1.5-pro"));
        assert!(json.contains("\"high\""));
    }
}
