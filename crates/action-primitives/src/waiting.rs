//! DOM settle detection
//!
//! A subtree is considered settled once it produced no mutation for a full
//! quiet window. Two timers run from the moment the subscription is registered:
//! the deadline timer and the quiet timer, which restarts on every mutation.
//! Whichever fires first decides the result; the other timer and the
//! subscription are dropped together with the future, so nothing fires after
//! the wait has completed.

use cdp_adapter::{MutationNotice, UiDriver};
use futures::{Stream, StreamExt};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::{
    errors::ActionError,
    types::{QuietStart, SettleReport, SettleWaitConfig},
};

/// Waits for a document subtree to stop mutating.
///
/// Every call builds a fresh subscription; the detector holds no state between
/// calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettleDetector {
    config: SettleWaitConfig,
}

impl SettleDetector {
    pub fn new(config: SettleWaitConfig) -> Self {
        Self { config }
    }

    /// Subscribe to mutations under `root` and wait for it to settle.
    pub async fn await_settle(
        &self,
        driver: &dyn UiDriver,
        root: &str,
    ) -> Result<SettleReport, ActionError> {
        let watch = driver.observe_mutations(root).await?;
        let observer = watch.id();
        debug!(?observer, root, "waiting for DOM to settle");

        let result = self.watch(watch).await;
        match &result {
            Ok(report) => debug!(
                ?observer,
                elapsed_ms = report.elapsed.as_millis() as u64,
                mutations = report.mutations,
                "DOM settled"
            ),
            Err(err) => warn!(?observer, root, "DOM did not settle: {}", err),
        }
        result
    }

    /// Drive the two timers over an already registered notice feed.
    ///
    /// The feed is consumed and dropped before this returns. A feed that ends
    /// simply stops resetting the quiet timer.
    pub async fn watch<S>(&self, mut notices: S) -> Result<SettleReport, ActionError>
    where
        S: Stream<Item = MutationNotice> + Unpin,
    {
        let started = Instant::now();
        let quiet_window = self.config.quiet_window();

        let deadline = sleep(self.config.deadline());
        tokio::pin!(deadline);
        let quiet = sleep(quiet_window);
        tokio::pin!(quiet);

        let mut quiet_armed = self.config.quiet_start() == QuietStart::Immediate;
        let mut feed_open = true;
        let mut mutations = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => {
                    return Err(ActionError::TimedOut {
                        deadline_ms: self.config.deadline().as_millis() as u64,
                        mutations,
                    });
                }

                _ = &mut quiet, if quiet_armed => {
                    return Ok(SettleReport {
                        elapsed: started.elapsed(),
                        mutations,
                    });
                }

                notice = notices.next(), if feed_open => match notice {
                    Some(_) => {
                        mutations += 1;
                        quiet.as_mut().reset(Instant::now() + quiet_window);
                        quiet_armed = true;
                    }
                    None => feed_open = false,
                },
            }
        }
    }
}
