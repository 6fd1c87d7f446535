//! surge-bot entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Momentum-ignition trading decision engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SURGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    surge_telemetry::init_logging()?;

    info!("Starting surge-bot v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > SURGE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SURGE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = surge_bot::AppConfig::load(&config_path)?;
    config.validate()?;

    let mut app = surge_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
