//! # Huerto
//!
//! Demo entry point for the Huerto garden simulation.
//!
//! Opens a garden against the in-memory backend, plants a few seeds and
//! lets the growth ticker run for a configured number of ticks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::HuertoConfig;

/// Main entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => HuertoConfig::load_from(path),
        None => HuertoConfig::load(),
    };
    config.validate();

    let filter = EnvFilter::from_default_env().add_directive("huerto=info".parse()?);
    if config.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!("Huerto starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run(&config).await?;

    info!("Huerto shutdown complete");
    Ok(())
}
