//! Page session primitives for board-migrator.
//!
//! This crate sits between the raw driver and the flows:
//! - [`PageSession`]: the explicit session context every flow receives
//! - [`SettleDetector`]: waits until a document subtree stops mutating
//! - [`ActionError`]: the error taxonomy flows propagate or isolate

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
