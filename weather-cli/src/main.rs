//! Binary crate for the `weather-viewer` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive browsing and configuration
//! - Printing the page regions to stdout, diagnostics to stderr

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_viewer=info,weather_viewer_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
