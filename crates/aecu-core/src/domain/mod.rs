//! AECU domain types.

pub mod error;
pub mod execution;
pub mod history;

pub use error::{AecuError, Result};
pub use execution::{ExecutionResult, ExecutionState};
pub use history::{HistoryEntry, HistoryResult, HistoryState};
