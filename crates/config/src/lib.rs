//! Configuration loading, validation, and management for TrendSpotter.
//!
//! Loads configuration from `~/.trendspotter/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trendspotter_core::backend::CapabilityTier;
use trendspotter_core::record::Schema;
use trendspotter_core::stats::LossMetric;

/// The root configuration structure.
///
/// Maps directly to `~/.trendspotter/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API credential for the generative backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Column mapping for the input table.
    #[serde(default = "default_schema")]
    pub schema: Schema,

    /// Diagnosis engine settings.
    #[serde(default)]
    pub diagnosis: DiagnosisConfig,

    /// Backend and discovery settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Narrative protocol settings.
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Page layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,
}

fn default_schema() -> Schema {
    Schema {
        dimension: "Category".into(),
        measure: "Discount".into(),
        profit: "Profit".into(),
        volume: Some("Quantity".into()),
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("schema", &self.schema)
            .field("diagnosis", &self.diagnosis)
            .field("backend", &self.backend)
            .field("narrative", &self.narrative)
            .field("layout", &self.layout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisConfig {
    /// Which metric ranks the segments.
    #[serde(default = "default_metric")]
    pub metric: LossMetric,

    /// Segments whose metric values differ by less than this are tied.
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,

    /// Display units for profit values.
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_metric() -> LossMetric {
    LossMetric::TotalProfit
}
fn default_tie_epsilon() -> f64 {
    1e-6
}
fn default_units() -> String {
    "USD".into()
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            tie_epsilon: default_tie_epsilon(),
            units: default_units(),
        }
    }
}

/// One ranked discovery candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreference {
    /// Fully-qualified model id (e.g. "models/gemini-1.5-pro").
    pub model: String,

    /// Tier reported for this candidate when it wins discovery.
    pub tier: CapabilityTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Generative Language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Ranked preference order, most capable first.
    #[serde(default = "default_preferences")]
    pub preferences: Vec<ModelPreference>,

    /// Timeout per probe or generation attempt, in seconds. No retries.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_preferences() -> Vec<ModelPreference> {
    vec![
        ModelPreference {
            model: "models/gemini-1.5-pro".into(),
            tier: CapabilityTier::High,
        },
        ModelPreference {
            model: "models/gemini-1.5-flash".into(),
            tier: CapabilityTier::Standard,
        },
        ModelPreference {
            model: "models/gemini-pro".into(),
            tier: CapabilityTier::Legacy,
        },
    ]
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            preferences: default_preferences(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Losses below this magnitude are not material; the sentinel is emitted
    /// without a backend call.
    #[serde(default = "default_materiality")]
    pub materiality_threshold: f64,

    /// Relative tolerance when matching response numbers to payload values.
    #[serde(default = "default_numeric_tolerance")]
    pub numeric_tolerance: f64,

    /// When false, backend availability errors downgrade to the sentinel and
    /// the numeric report still ships.
    #[serde(default = "default_true")]
    pub required: bool,

    /// Sampling temperature for the generation call.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Upper bound on narrative length the layout engine must handle.
    #[serde(default = "default_max_narrative_chars")]
    pub max_narrative_chars: usize,
}

fn default_materiality() -> f64 {
    100.0
}
fn default_numeric_tolerance() -> f64 {
    0.01
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    40
}
fn default_max_narrative_chars() -> usize {
    4000
}
fn default_true() -> bool {
    true
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: default_materiality(),
            numeric_tolerance: default_numeric_tolerance(),
            required: true,
            temperature: default_temperature(),
            top_k: default_top_k(),
            max_narrative_chars: default_max_narrative_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Page width in points (letter: 612).
    #[serde(default = "default_page_width")]
    pub page_width: f32,

    /// Page height in points (letter: 792).
    #[serde(default = "default_page_height")]
    pub page_height: f32,

    /// Left/right page margin.
    #[serde(default = "default_margin")]
    pub margin: f32,

    /// Vertical space reserved for the heading block.
    #[serde(default = "default_heading_height")]
    pub heading_height: f32,

    /// Average glyph width used for the character budget.
    #[serde(default = "default_glyph_width")]
    pub glyph_width: f32,

    /// Starting line height.
    #[serde(default = "default_line_height")]
    pub line_height: f32,

    /// Line height below which text is no longer legible.
    #[serde(default = "default_min_line_height")]
    pub min_line_height: f32,

    /// Height of the chart band at the bottom of the page.
    #[serde(default = "default_chart_height")]
    pub chart_height: f32,
}

fn default_page_width() -> f32 {
    612.0
}
fn default_page_height() -> f32 {
    792.0
}
fn default_margin() -> f32 {
    36.0
}
fn default_heading_height() -> f32 {
    90.0
}
fn default_glyph_width() -> f32 {
    6.0
}
fn default_line_height() -> f32 {
    14.0
}
fn default_min_line_height() -> f32 {
    6.0
}
fn default_chart_height() -> f32 {
    220.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            heading_height: default_heading_height(),
            glyph_width: default_glyph_width(),
            line_height: default_line_height(),
            min_line_height: default_min_line_height(),
            chart_height: default_chart_height(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.trendspotter/config.toml).
    ///
    /// Also checks environment variables for the credential:
    /// - `TRENDSPOTTER_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("TRENDSPOTTER_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".trendspotter")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.narrative.temperature) {
            return Err(ConfigError::ValidationError(
                "narrative.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.diagnosis.tie_epsilon < 0.0 {
            return Err(ConfigError::ValidationError(
                "diagnosis.tie_epsilon must be non-negative".into(),
            ));
        }

        if self.narrative.numeric_tolerance <= 0.0 {
            return Err(ConfigError::ValidationError(
                "narrative.numeric_tolerance must be positive".into(),
            ));
        }

        if self.layout.min_line_height > self.layout.line_height {
            return Err(ConfigError::ValidationError(
                "layout.min_line_height cannot exceed layout.line_height".into(),
            ));
        }

        if self.layout.glyph_width <= 0.0 {
            return Err(ConfigError::ValidationError(
                "layout.glyph_width must be positive".into(),
            ));
        }

        if self.backend.preferences.is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.preferences must list at least one candidate".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API credential is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for first-run setup).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            schema: default_schema(),
            diagnosis: DiagnosisConfig::default(),
            backend: BackendConfig::default(),
            narrative: NarrativeConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schema.dimension, "Category");
        assert_eq!(config.backend.preferences.len(), 3);
        assert_eq!(config.backend.preferences[0].tier, CapabilityTier::High);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.schema.measure, config.schema.measure);
        assert_eq!(
            parsed.narrative.materiality_threshold,
            config.narrative.materiality_threshold
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.narrative.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_line_height_must_not_exceed_base() {
        let mut config = AppConfig::default();
        config.layout.min_line_height = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_preferences_rejected() {
        let mut config = AppConfig::default();
        config.backend.preferences.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_overrides_from_a_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[diagnosis]\nunits = \"EUR\"\n\n[narrative]\nmateriality_threshold = 250.0\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.diagnosis.units, "EUR");
        assert_eq!(config.narrative.materiality_threshold, 250.0);
        // Unspecified sections keep their defaults.
        assert_eq!(config.layout.page_width, 612.0);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().diagnosis.units, "USD");
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let config = AppConfig {
            api_key: Some("AIza-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn preferences_parse_from_toml() {
        let toml_str = r#"
[[backend.preferences]]
model = "models/gemini-1.5-pro"
tier = "high"

[[backend.preferences]]
model = "models/gemini-pro"
tier = "legacy"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.preferences.len(), 2);
        assert_eq!(config.backend.preferences[1].tier, CapabilityTier::Legacy);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-1.5-pro"));
        assert!(toml_str.contains("materiality_threshold"));
    }
}
