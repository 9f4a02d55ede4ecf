//! Migration pipeline executor

use std::sync::Arc;

use action_primitives::{ActionError, PageSession};
use chrono::Utc;
use tracing::{debug, info};

use crate::errors::FlowError;
use crate::progress::{NoopProgress, PipelineEvent, ProgressSink};
use crate::strategies::{DefaultFailureHandler, FailureDecision, FailureHandler};
use crate::types::{
    CreationWidget, FailureStrategy, Item, ItemPhase, ItemRecord, MigrationOutcome, PipelineRun,
};

/// Default number of items attempted per run.
pub const DEFAULT_CAP: usize = 5;

/// Error from one item together with the phase it surfaced in.
struct ItemFailure {
    phase: ItemPhase,
    error: ActionError,
}

/// Creates items one at a time through a shared creation widget.
///
/// The widget is opened once before the first item and closed once after the
/// last attempted item, whatever the individual outcomes were. Only one item is
/// ever in flight, so the widget never sees interleaved input.
pub struct MigrationPipeline {
    widget: CreationWidget,
    cap: usize,
    strategy: FailureStrategy,
    failure_handler: Arc<dyn FailureHandler>,
    progress: Arc<dyn ProgressSink>,
}

impl MigrationPipeline {
    pub fn new(widget: CreationWidget) -> Self {
        Self {
            widget,
            cap: DEFAULT_CAP,
            strategy: FailureStrategy::default(),
            failure_handler: Arc::new(DefaultFailureHandler),
            progress: Arc::new(NoopProgress),
        }
    }

    /// Attempt at most `cap` items; the rest are counted as not attempted.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Create `items` in order on the page behind `session`.
    pub async fn migrate(
        &self,
        session: &PageSession,
        items: &[Item],
    ) -> Result<PipelineRun, FlowError> {
        if items.is_empty() {
            info!("no items to migrate");
            return Ok(PipelineRun::empty());
        }

        let started_at = Utc::now();
        info!(
            items = items.len(),
            cap = self.cap,
            strategy = ?self.strategy,
            "starting migration"
        );

        session
            .click(&self.widget.trigger)
            .await
            .map_err(FlowError::WidgetOpen)?;
        debug!("creation widget opened");

        let mut records = Vec::with_capacity(items.len().min(self.cap));
        for (position, item) in items.iter().take(self.cap).enumerate() {
            self.progress.emit(PipelineEvent::ItemStarted {
                position,
                item: item.clone(),
            });

            match self.create_item(session, item).await {
                Ok(()) => {
                    info!(position, item = %item, "item created");
                    self.progress.emit(PipelineEvent::ItemSucceeded {
                        position,
                        item: item.clone(),
                    });
                    records.push(ItemRecord {
                        item: item.clone(),
                        outcome: MigrationOutcome::Success,
                    });
                }
                Err(ItemFailure { phase, error }) => {
                    let reason = error.to_string();
                    self.progress.emit(PipelineEvent::ItemFailed {
                        position,
                        item: item.clone(),
                        phase,
                        reason: reason.clone(),
                    });
                    records.push(ItemRecord {
                        item: item.clone(),
                        outcome: MigrationOutcome::Failed {
                            reason,
                            kind: error.kind(),
                            phase,
                        },
                    });

                    let decision = self.failure_handler.handle_failure(
                        position,
                        item,
                        phase,
                        &error,
                        self.strategy,
                    );
                    if decision == FailureDecision::Abort {
                        break;
                    }
                }
            }
        }

        let run = PipelineRun {
            not_attempted: items.len() - records.len(),
            records,
            started_at,
            finished_at: Utc::now(),
        };

        if let Err(source) = session.click(&self.widget.cancel).await {
            return Err(FlowError::WidgetClose { source, run });
        }
        debug!("creation widget closed");

        info!(
            attempted = run.attempted(),
            succeeded = run.succeeded(),
            failed = run.failed(),
            not_attempted = run.not_attempted,
            latency_ms = run.latency_ms(),
            "migration finished"
        );
        Ok(run)
    }

    /// Drive one item through its phases until it is done or failed.
    async fn create_item(&self, session: &PageSession, item: &Item) -> Result<(), ItemFailure> {
        let mut phase = ItemPhase::Pending;
        let mut failure = None;
        while !phase.is_terminal() {
            phase = match self.perform(session, item, phase).await {
                Ok(()) => phase.advance(),
                Err(error) => {
                    debug!(item = %item, %phase, "item moved to failed");
                    failure = Some(ItemFailure { phase, error });
                    phase.fail()
                }
            };
        }
        failure.map_or(Ok(()), Err)
    }

    /// Work done in `phase`. Pending only marks the item as started.
    async fn perform(
        &self,
        session: &PageSession,
        item: &Item,
        phase: ItemPhase,
    ) -> Result<(), ActionError> {
        match phase {
            ItemPhase::Typing => session.type_text(&self.widget.input, item.text()).await,
            ItemPhase::Submitting => session.click(&self.widget.confirm).await,
            ItemPhase::SettleWait => session.settle().await.map(|_| ()),
            ItemPhase::Pending | ItemPhase::Done | ItemPhase::Failed => Ok(()),
        }
    }
}

impl Default for MigrationPipeline {
    fn default() -> Self {
        Self::new(CreationWidget::default())
    }
}
