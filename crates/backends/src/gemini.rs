//! Google Generative Language API backend.
//!
//! Features:
//! - credential passed as a `key` query parameter
//! - model listing via `GET /models`, filtered to entries that support
//!   `generateContent`
//! - generation via `POST /{model}:generateContent` with a generation config
//! - probing via a one-token generation request

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use trendspotter_core::backend::{Backend, GenerateRequest, GenerateResponse};
use trendspotter_core::error::BackendError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generative Language API backend.
pub struct GeminiBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new backend with the given credential.
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn map_status(status: u16, body: String, model: &str) -> BackendError {
        match status {
            401 | 403 => BackendError::AuthenticationFailed("Invalid API key".into()),
            404 => BackendError::ModelNotFound(model.to_string()),
            429 => BackendError::RateLimited {
                retry_after_secs: 5,
            },
            _ => BackendError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    async fn generate_inner(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GeminiResponse, BackendError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
            "topK": request.top_k,
        });
        if let Some(max) = request.max_tokens {
            generation_config["maxOutputTokens"] = serde_json::json!(max);
        }

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        });

        debug!(backend = "gemini", model = %model, "Sending generation request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(Self::map_status(status, error_body, model));
        }

        response.json().await.map_err(|e| BackendError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Gemini response: {e}"),
        })
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(e.to_string())
            } else {
                BackendError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, error_body, "models"));
        }

        let listing: ModelListing =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse model listing: {e}"),
            })?;

        // Only models that can actually generate content are usable.
        let models: Vec<String> = listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| m.name)
            .collect();

        debug!(count = models.len(), "Listed generation-capable models");
        Ok(models)
    }

    async fn probe(&self, model: &str) -> Result<(), BackendError> {
        let request = GenerateRequest {
            prompt: "ping".into(),
            temperature: 0.0,
            top_k: 1,
            max_tokens: Some(1),
        };
        self.generate_inner(model, &request).await.map(|_| ())
    }

    async fn generate(
        &self,
        model: &str,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let response = self.generate_inner(model, &request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(BackendError::ApiError {
                status_code: 200,
                message: "Response contained no text candidates".into(),
            });
        }

        Ok(GenerateResponse {
            text,
            model: model.to_string(),
        })
    }
}

// --- Generative Language API types ---

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
    #[serde(default, rename = "supportedGenerationMethods")]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let backend = GeminiBackend::new("AIza-test").unwrap();
        assert_eq!(backend.name(), "gemini");
        assert_eq!(backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let backend = GeminiBackend::new("AIza-test")
            .unwrap()
            .with_base_url("https://proxy.example.com/v1beta/");
        assert_eq!(backend.base_url, "https://proxy.example.com/v1beta");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            GeminiBackend::map_status(401, String::new(), "m"),
            BackendError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GeminiBackend::map_status(403, String::new(), "m"),
            BackendError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GeminiBackend::map_status(404, String::new(), "models/gemini-x"),
            BackendError::ModelNotFound(ref m) if m == "models/gemini-x"
        ));
        assert!(matches!(
            GeminiBackend::map_status(429, String::new(), "m"),
            BackendError::RateLimited { .. }
        ));
        assert!(matches!(
            GeminiBackend::map_status(500, "boom".into(), "m"),
            BackendError::ApiError {
                status_code: 500,
                ..
            }
        ));
    }

    #[test]
    fn parse_model_listing() {
        let listing: ModelListing = serde_json::from_str(
            r#"{
                "models": [
                    {"name": "models/gemini-1.5-pro",
                     "supportedGenerationMethods": ["generateContent", "countTokens"]},
                    {"name": "models/embedding-001",
                     "supportedGenerationMethods": ["embedContent"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(listing.models.len(), 2);
        assert_eq!(listing.models[0].name, "models/gemini-1.5-pro");
        assert!(listing.models[0]
            .supported_generation_methods
            .contains(&"generateContent".to_string()));
    }

    #[test]
    fn parse_generation_response() {
        let resp: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"parts": [{"text": "Cause: deep discounting."}]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(
            resp.candidates[0].content.parts[0].text.as_deref(),
            Some("Cause: deep discounting.")
        );
    }

    #[test]
    fn parse_empty_response() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }
}
