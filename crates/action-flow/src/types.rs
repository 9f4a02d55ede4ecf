//! Pipeline data types

use action_primitives::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One extracted entry. Identity is its text; duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(String);

impl Item {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Per-item progress.
///
/// Success path: Pending -> Typing -> Submitting -> SettleWait -> Done.
/// Typing, Submitting and SettleWait may move to Failed. Done and Failed are
/// terminal; no phase is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    Pending,
    Typing,
    Submitting,
    SettleWait,
    Done,
    Failed,
}

impl ItemPhase {
    /// Phase reached once the work of this phase succeeded.
    pub fn advance(self) -> ItemPhase {
        match self {
            ItemPhase::Pending => ItemPhase::Typing,
            ItemPhase::Typing => ItemPhase::Submitting,
            ItemPhase::Submitting => ItemPhase::SettleWait,
            ItemPhase::SettleWait | ItemPhase::Done => ItemPhase::Done,
            ItemPhase::Failed => ItemPhase::Failed,
        }
    }

    /// Phase reached when the work of this phase failed.
    pub fn fail(self) -> ItemPhase {
        if self.is_terminal() {
            self
        } else {
            ItemPhase::Failed
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemPhase::Done | ItemPhase::Failed)
    }
}

impl fmt::Display for ItemPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemPhase::Pending => "pending",
            ItemPhase::Typing => "typing",
            ItemPhase::Submitting => "submitting",
            ItemPhase::SettleWait => "settle-wait",
            ItemPhase::Done => "done",
            ItemPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal result of one attempted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Success,
    Failed {
        reason: String,
        kind: ErrorKind,
        /// Phase in which the error surfaced
        phase: ItemPhase,
    },
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MigrationOutcome::Success)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            MigrationOutcome::Success => None,
            MigrationOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item: Item,
    pub outcome: MigrationOutcome,
}

/// Outcomes of every attempted item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Attempted items with their outcomes
    pub records: Vec<ItemRecord>,

    /// Items left untouched because of the cap or an aborting failure
    pub not_attempted: usize,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            records: Vec::new(),
            not_attempted: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &MigrationOutcome> {
        self.records.iter().map(|record| &record.outcome)
    }

    pub fn latency_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// What to do after an item failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Record the failure and move on to the next item
    #[default]
    Continue,

    /// Record the failure and attempt no further items
    Abort,
}

/// Selectors of the shared creation widget on the destination surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationWidget {
    /// Opens the editor
    pub trigger: String,

    /// Editable input of the open editor
    pub input: String,

    /// Submits the current entry
    pub confirm: String,

    /// Closes the editor
    pub cancel: String,
}

impl Default for CreationWidget {
    fn default() -> Self {
        Self {
            trigger: "button.plus_add_button".to_string(),
            input: r#"form.task_editor div[role="textbox"]"#.to_string(),
            confirm: r#"form.task_editor button[aria-label="Add task"]"#.to_string(),
            cancel: r#"form.task_editor button[aria-label="Cancel"]"#.to_string(),
        }
    }
}
