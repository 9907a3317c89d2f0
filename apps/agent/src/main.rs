//! Queue timer agent entry point.

mod app;
mod config;
mod lock;
mod sessions;

use std::time::Duration;

use anyhow::Context;
use queuetimer_protocol::constants::CONSOLE_LOG_NAME;
use queuetimer_steam::Paths;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting queue timer"
    );

    // Load configuration.
    let config = config::Config::load()?;
    tracing::info!(
        grace_secs = config.grace_period_secs,
        mapless = ?config.mapless_sessions,
        "configuration loaded"
    );

    let _lock = lock::InstanceLock::acquire(config::config_dir()?.join(".lock"))
        .context("failed to acquire instance lock")?;

    let log_path = match &config.log_path {
        Some(path) => path.clone(),
        None => Paths::new()
            .and_then(|paths| paths.console_log_path(CONSOLE_LOG_NAME))
            .context("could not locate the game's console log; set log_path in the config")?,
    };
    tracing::info!(path = %log_path.display(), "watching console log");

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(app::run(config, log_path));
    // A pending stdin read cannot be cancelled; don't wait for it.
    rt.shutdown_timeout(Duration::from_millis(100));
    result?;

    tracing::info!("agent shut down cleanly");
    Ok(())
}
