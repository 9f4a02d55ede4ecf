//! Pipeline error types

use action_primitives::ActionError;
use thiserror::Error;

use crate::types::PipelineRun;

/// Failures outside the per-item boundary. These end the run.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The creation widget could not be opened; no item was attempted
    #[error("Failed to open creation widget: {0}")]
    WidgetOpen(#[source] ActionError),

    /// Every item was attempted but the widget could not be closed
    #[error("Failed to close creation widget after {} attempted items: {source}", .run.attempted())]
    WidgetClose {
        #[source]
        source: ActionError,
        run: PipelineRun,
    },
}

impl FlowError {
    /// Outcomes recorded before the failure, if any item was attempted.
    pub fn partial_run(&self) -> Option<&PipelineRun> {
        match self {
            FlowError::WidgetOpen(_) => None,
            FlowError::WidgetClose { run, .. } => Some(run),
        }
    }
}
