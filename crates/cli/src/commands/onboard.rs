//! `trendspotter onboard` — First-time setup.

use trendspotter_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📈 TrendSpotter — First-Time Setup");
    println!("==================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config file exists: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created default config: {}", config_path.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Set your credential: export TRENDSPOTTER_API_KEY=...");
    println!("     (or add api_key to {})", config_path.display());
    println!("  2. Run a report: trendspotter report --input sales.csv");
    println!("  3. Check setup:  trendspotter doctor");

    Ok(())
}
