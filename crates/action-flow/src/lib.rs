//! Migration pipeline
//!
//! Turns an ordered list of extracted items into create-actions against a
//! single shared creation widget. Items run strictly one after another; a
//! failing item is recorded and, under the default strategy, does not stop the
//! items after it.

pub mod errors;
pub mod executor;
pub mod progress;
pub mod strategies;
pub mod types;

pub use errors::FlowError;
pub use executor::MigrationPipeline;
pub use progress::{NoopProgress, PipelineEvent, ProgressSink};
pub use strategies::{DefaultFailureHandler, FailureDecision, FailureHandler};
pub use types::{
    CreationWidget, FailureStrategy, Item, ItemPhase, ItemRecord, MigrationOutcome, PipelineRun,
};
