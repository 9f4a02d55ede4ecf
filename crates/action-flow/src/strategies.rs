//! Failure handling strategies

use action_primitives::ActionError;
use tracing::warn;

use crate::types::{FailureStrategy, Item, ItemPhase};

/// Decision taken after an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Attempt the next item
    Continue,

    /// Stop attempting items; the widget is still closed
    Abort,
}

/// Failure handler trait
pub trait FailureHandler: Send + Sync {
    /// Decide how the pipeline proceeds after `item` failed in `phase`.
    fn handle_failure(
        &self,
        position: usize,
        item: &Item,
        phase: ItemPhase,
        error: &ActionError,
        strategy: FailureStrategy,
    ) -> FailureDecision;
}

/// Logs the failure and applies the strategy as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFailureHandler;

impl FailureHandler for DefaultFailureHandler {
    fn handle_failure(
        &self,
        position: usize,
        item: &Item,
        phase: ItemPhase,
        error: &ActionError,
        strategy: FailureStrategy,
    ) -> FailureDecision {
        match strategy {
            FailureStrategy::Continue => {
                warn!(
                    position,
                    item = %item,
                    %phase,
                    "item failed, continuing with next item: {}",
                    error
                );
                FailureDecision::Continue
            }
            FailureStrategy::Abort => {
                warn!(
                    position,
                    item = %item,
                    %phase,
                    "item failed, attempting no further items: {}",
                    error
                );
                FailureDecision::Abort
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handler_follows_strategy() {
        let handler = DefaultFailureHandler;
        let item = Item::from("Fix roof");
        let error = ActionError::ElementNotFound("#confirm".to_string());

        assert_eq!(
            handler.handle_failure(0, &item, ItemPhase::Submitting, &error, FailureStrategy::Continue),
            FailureDecision::Continue
        );
        assert_eq!(
            handler.handle_failure(0, &item, ItemPhase::Submitting, &error, FailureStrategy::Abort),
            FailureDecision::Abort
        );
    }
}
