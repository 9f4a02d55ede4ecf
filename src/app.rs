//! End-to-end run: extract, authenticate, migrate.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

use action_flow::{MigrationPipeline, PipelineEvent, PipelineRun, ProgressSink};
use action_primitives::PageSession;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::auth::{AuthenticationFlow, Credentials};
use crate::config::MigratorConfig;
use crate::extract::ItemExtractor;

/// Writes human-readable progress lines.
pub struct ConsoleProgress<W> {
    out: Mutex<W>,
}

impl ConsoleProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn line(&self, message: impl Display) {
        let mut out = self.out.lock();
        // Write errors are dropped.
        let _ = writeln!(out, "{message}");
        let _ = out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ProgressSink for ConsoleProgress<W> {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::ItemStarted { item, .. } => {
                self.line(format_args!("Adding item: \"{item}\""));
            }
            PipelineEvent::ItemSucceeded { item, .. } => {
                self.line(format_args!("Item \"{item}\" added"));
            }
            PipelineEvent::ItemFailed { item, reason, .. } => {
                self.line(format_args!(
                    "Something failed when adding item \"{item}\": {reason}"
                ));
            }
        }
    }
}

pub struct Migrator<W> {
    config: MigratorConfig,
    console: Arc<ConsoleProgress<W>>,
}

impl<W: Write + Send + 'static> Migrator<W> {
    pub fn new(config: MigratorConfig, console: Arc<ConsoleProgress<W>>) -> Self {
        Self { config, console }
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Run every phase on `session` without closing it.
    ///
    /// Extraction, authentication and widget errors are fatal; item failures
    /// are recorded in the returned run.
    pub async fn run(&self, session: &PageSession, credentials: &Credentials) -> Result<PipelineRun> {
        let cfg = &self.config;

        self.console.line("Getting board items...");
        let items = ItemExtractor::new(cfg.source.clone(), cfg.viewport)
            .extract(session)
            .await
            .context("failed to extract items from the source board")?;
        let labels: Vec<&str> = items.iter().map(|item| item.text()).collect();
        self.console
            .line(format_args!("Items found: {}", labels.join(", ")));

        self.console.line("Logging in to the destination...");
        AuthenticationFlow::new(cfg.destination.clone(), cfg.viewport)
            .authenticate(session, credentials)
            .await
            .context("failed to sign in to the destination")?;

        self.console.line("Adding items...");
        let pipeline = MigrationPipeline::new(cfg.destination.widget.clone())
            .with_cap(cfg.migration.cap)
            .with_strategy(cfg.migration.on_item_failure)
            .with_progress(self.console.clone());
        let run = pipeline
            .migrate(session, &items)
            .await
            .context("migration pipeline failed")?;

        if run.not_attempted > 0 {
            self.console.line(format_args!(
                "{} item(s) not attempted (cap {})",
                run.not_attempted, cfg.migration.cap
            ));
        }
        self.console.line(format_args!(
            "Finished: {} added, {} failed",
            run.succeeded(),
            run.failed()
        ));
        Ok(run)
    }

    /// [`Migrator::run`], then close the session on every exit path.
    pub async fn run_and_close(
        &self,
        session: &PageSession,
        credentials: &Credentials,
    ) -> Result<PipelineRun> {
        let result = self.run(session, credentials).await;
        if let Err(err) = &result {
            error!("run aborted: {:#}", err);
        }

        match session.close().await {
            Ok(()) => info!("browser session closed"),
            Err(close_err) => warn!("failed to close browser session: {}", close_err),
        }
        result
    }
}
