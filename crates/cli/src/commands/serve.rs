//! `sibyl serve` — Start the HTTP gateway.

use std::path::PathBuf;

use sibyl_config::AppConfig;

pub async fn run(
    port_override: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_from(&path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        tracing::warn!("no upstream API key configured; chat requests will be rejected upstream");
    }

    println!("🔮 Sibyl Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.upstream.model);

    sibyl_gateway::serve(config).await?;

    Ok(())
}
