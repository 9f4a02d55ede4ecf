//! Board migrator - copy board cards into a task app through a browser

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use board_migrator::{load_config, ConsoleProgress, Credentials, Migrator};
use cdp_adapter::ChromiumDriver;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Copy the cards of a public board into a task app
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Maximum number of items to migrate (overrides the config file)
    #[arg(long, value_name = "N")]
    cap: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting board-migrator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if let Some(cap) = cli.cap {
        config.migration.cap = cap;
    }
    if cli.headful {
        config.browser.headless = false;
    }

    let credentials = Credentials::from_env().context("Missing destination credentials")?;

    let driver = ChromiumDriver::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;
    let session = config.session(Arc::new(driver))?;

    let migrator = Migrator::new(config, Arc::new(ConsoleProgress::stdout()));
    migrator.run_and_close(&session, &credentials).await?;

    Ok(())
}

/// Diagnostics go to stderr so stdout carries only progress lines.
fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
