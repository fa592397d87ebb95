//! `trendspotter doctor` — Diagnose setup health.

use trendspotter_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 TrendSpotter Doctor — Setup Diagnostics");
    println!("==========================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");

                if config.has_api_key() {
                    println!("  ✅ API key configured");
                } else {
                    println!(
                        "  ⚠️  No API key — set TRENDSPOTTER_API_KEY or add api_key to config.toml"
                    );
                    issues += 1;
                }

                if config.backend.preferences.is_empty() {
                    println!("  ❌ backend.preferences is empty — discovery has no candidates");
                    issues += 1;
                } else {
                    println!(
                        "  ✅ {} ranked model candidate(s)",
                        config.backend.preferences.len()
                    );
                }

                println!(
                    "  ✅ Schema: dimension='{}' measure='{}' profit='{}'",
                    config.schema.dimension, config.schema.measure, config.schema.profit
                );
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No config file — run `trendspotter onboard`");
        issues += 1;
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
