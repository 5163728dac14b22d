//! # prochepro
//!
//! API server, Telegram bot and the scheduled jobs of the ProchePro
//! backend, one subcommand each.

mod app;
mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use configs::{LogFormat, LogSettings, Settings};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        tracing::error!(error = format!("{error:#}"), "command failed");
        eprintln!("prochepro error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("cannot load settings")?;
    init_tracing(&settings.log);
    commands::run(cli.command, settings).await
}

/// `RUST_LOG` wins over `log.level`. Output goes to stderr so command
/// reports on stdout stay parseable.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}
