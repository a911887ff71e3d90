//! `sibyl doctor` — Diagnose configuration and upstream health.

use sibyl_config::AppConfig;
use sibyl_provider::OpenAiCompatClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Sibyl Doctor — System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. See above for details.");
            return Ok(());
        }
    };

    // Check API key
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set SIBYL_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    println!("  ℹ️  Upstream: {} ({})", config.upstream.api_url, config.upstream.model);
    println!("  ℹ️  Search backend: {}", config.search.backend);
    println!(
        "  ℹ️  Knowledge base: {}",
        if config.knowledge.enabled { "enabled" } else { "disabled" }
    );

    // Check upstream reachability
    let client = OpenAiCompatClient::new(
        &config.upstream.api_url,
        config.upstream.api_key.as_deref().unwrap_or_default(),
        &config.upstream.model,
    );
    match client.health_check().await {
        Ok(true) => println!("  ✅ Upstream reachable"),
        Ok(false) => {
            println!("  ⚠️  Upstream responded with an error status");
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Upstream unreachable: {e}");
            issues += 1;
        }
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
