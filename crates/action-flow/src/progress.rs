//! Progress reporting hooks

use crate::types::{Item, ItemPhase};

/// Emitted as the pipeline works through its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    ItemStarted {
        position: usize,
        item: Item,
    },
    ItemSucceeded {
        position: usize,
        item: Item,
    },
    ItemFailed {
        position: usize,
        item: Item,
        phase: ItemPhase,
        reason: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: PipelineEvent) {}
}
