//! Core data types for settle detection

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ActionError;

/// When the quiet timer starts counting.
///
/// - OnFirstMutation: the timer is armed by the first mutation; a subtree that
///   never mutates runs into the deadline
/// - Immediate: the timer is armed at registration; an idle subtree settles
///   after one quiet window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuietStart {
    #[default]
    OnFirstMutation,
    Immediate,
}

/// Timing parameters of one settle wait.
///
/// Always satisfies `0 < quiet_window < deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleWaitConfig {
    deadline: Duration,
    quiet_window: Duration,
    quiet_start: QuietStart,
}

impl SettleWaitConfig {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);
    pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(deadline: Duration, quiet_window: Duration) -> Result<Self, ActionError> {
        if quiet_window.is_zero() {
            return Err(ActionError::InvalidConfig(
                "quiet window must be greater than zero".to_string(),
            ));
        }
        if quiet_window >= deadline {
            return Err(ActionError::InvalidConfig(format!(
                "quiet window ({}ms) must be shorter than the deadline ({}ms)",
                quiet_window.as_millis(),
                deadline.as_millis()
            )));
        }
        Ok(Self {
            deadline,
            quiet_window,
            quiet_start: QuietStart::default(),
        })
    }

    pub fn from_millis(deadline_ms: u64, quiet_window_ms: u64) -> Result<Self, ActionError> {
        Self::new(
            Duration::from_millis(deadline_ms),
            Duration::from_millis(quiet_window_ms),
        )
    }

    pub fn with_quiet_start(mut self, quiet_start: QuietStart) -> Self {
        self.quiet_start = quiet_start;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    pub fn quiet_start(&self) -> QuietStart {
        self.quiet_start
    }
}

impl Default for SettleWaitConfig {
    fn default() -> Self {
        Self {
            deadline: Self::DEFAULT_DEADLINE,
            quiet_window: Self::DEFAULT_QUIET_WINDOW,
            quiet_start: QuietStart::default(),
        }
    }
}

/// What a successful settle wait observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleReport {
    /// Time from registration until the quiet window elapsed
    pub elapsed: Duration,

    /// Mutation notifications received before settling
    pub mutations: u64,
}
