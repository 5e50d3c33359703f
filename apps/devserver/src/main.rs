//! Plugin development server entry point.

mod app;
mod config;
mod pages;
mod settings;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting plugin development server"
    );

    let config = config::Config::load()?;
    tracing::info!(
        path = %config::config_path().display(),
        port = config.port,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("development server shut down cleanly");
    Ok(())
}
