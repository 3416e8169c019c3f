//! slircbot - Straylight IRC Bot

use std::sync::Arc;

use slircbot::config::{Config, LogFormat, validation};
use slircbot::network::ConnectionManager;
use slircbot::plugins::{ModuleRegistry, register_builtins};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "slircbot.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("Failed to load config {config_path}: {e}");
        e
    })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {config_path}",
            errors.len()
        ));
    }

    info!(
        server = %config.server.host,
        port = config.server.port,
        nick = %config.identity.nick,
        "Starting slircbot"
    );

    let mut registry = ModuleRegistry::new();
    register_builtins(&mut registry);

    let mut manager = ConnectionManager::new(Arc::new(config), registry)?;
    manager.load_configured_modules();

    tokio::select! {
        _ = manager.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
