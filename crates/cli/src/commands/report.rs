//! `trendspotter report` — Diagnose a sales CSV and emit the report page.

use std::path::PathBuf;
use trendspotter_backends::GeminiBackend;
use trendspotter_config::AppConfig;
use trendspotter_diagnosis::load_csv;
use trendspotter_pipeline::{run as run_pipeline, RunContext};

pub async fn run(input: PathBuf, out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let api_key = match &config.api_key {
        Some(key) => key.clone(),
        None if !config.narrative.required => String::new(),
        None => {
            return Err(
                "No API key configured — set TRENDSPOTTER_API_KEY or add api_key to config.toml"
                    .into(),
            );
        }
    };

    let records = load_csv(&input, &config.schema)?;
    println!("📊 Loaded {} rows from {}", records.len(), input.display());

    let backend = GeminiBackend::new(api_key)?.with_base_url(&config.backend.base_url);
    let mut ctx = RunContext::new(config);

    let outcome = run_pipeline(&mut ctx, &backend, &records).await?;

    println!(
        "🔎 Worst segment: {} ({} loss of {:.2})",
        outcome.diagnostic.segment,
        outcome.diagnostic.metric,
        outcome.diagnostic.loss_magnitude
    );
    if outcome.narrative.is_inconclusive() {
        println!("📝 Narrative: inconclusive (sentinel emitted)");
    } else if let Some(model) = &outcome.page.model {
        println!("📝 Narrative generated by {model}");
    }

    let json = serde_json::to_string_pretty(&outcome.page)?;
    match out {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("✅ Page description written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
