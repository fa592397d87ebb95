//! `trendspotter models` — List the models this credential can use.

use trendspotter_backends::GeminiBackend;
use trendspotter_config::AppConfig;
use trendspotter_core::backend::Backend;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let Some(api_key) = config.api_key.clone() else {
        return Err(
            "No API key configured — set TRENDSPOTTER_API_KEY or add api_key to config.toml"
                .into(),
        );
    };

    let backend = GeminiBackend::new(api_key)?.with_base_url(&config.backend.base_url);
    let models = backend.list_models().await?;

    println!("🤖 Generation-capable models for this credential");
    println!("=================================================");
    println!();

    for model in &models {
        let tier = config
            .backend
            .preferences
            .iter()
            .find(|p| p.model == *model)
            .map(|p| p.tier.to_string())
            .unwrap_or_else(|| "-".into());
        println!("  {model:<40} {tier}");
    }

    println!();
    println!("  Ranked preference order:");
    for (i, pref) in config.backend.preferences.iter().enumerate() {
        let available = if models.contains(&pref.model) {
            "available"
        } else {
            "not available"
        };
        println!("    {}. {} ({}, {available})", i + 1, pref.model, pref.tier);
    }

    Ok(())
}
