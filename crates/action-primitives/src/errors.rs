//! Error types for page session operations

use cdp_adapter::{AdapterError, AdapterErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by page session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// A selector matched no element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page failed to load or transition
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// The settle deadline passed before the document went quiet
    #[error("Timed out after {deadline_ms}ms waiting for the page to settle ({mutations} mutations observed)")]
    TimedOut { deadline_ms: u64, mutations: u64 },

    /// Protocol or transport failure inside the driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Settle configuration violates its invariants
    #[error("Invalid settle configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`ActionError`], recorded on failed outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ElementNotFound,
    NavigationError,
    TimedOut,
    Driver,
    InvalidConfig,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            ActionError::NavigationError(_) => ErrorKind::NavigationError,
            ActionError::TimedOut { .. } => ErrorKind::TimedOut,
            ActionError::Driver(_) => ErrorKind::Driver,
            ActionError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let detail = err
            .hint
            .clone()
            .unwrap_or_else(|| err.kind.to_string());
        match err.kind {
            AdapterErrorKind::ElementNotFound => ActionError::ElementNotFound(detail),
            AdapterErrorKind::Navigation => ActionError::NavigationError(detail),
            AdapterErrorKind::CdpIo | AdapterErrorKind::Internal => {
                ActionError::Driver(err.to_string())
            }
        }
    }
}
