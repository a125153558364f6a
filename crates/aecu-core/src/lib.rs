//! AECU Core Library
//!
//! Discovers upgrade scripts in a content tree, selects those matching the
//! active run modes, executes them (with one level of fallback) and keeps
//! an auditable execution history.
//!
//! ## Key Components
//!
//! - `path_resolver`: folder / run-mode / script-name classification
//! - `discovery`: depth-first candidate collection
//! - `fallback` + `executor`: single script runs with fallback
//! - `history`: RUNNING -> FINISHED history entries
//! - `service`: the `AecuService` facade

pub mod config;
pub mod discovery;
pub mod domain;
pub mod executor;
pub mod fallback;
pub mod history;
pub mod obs;
pub mod path_resolver;
pub mod service;
pub mod telemetry;

pub use config::{AecuConfig, DEFAULT_HISTORY_ROOT, DEFAULT_SCRIPT_EXTENSION, FALLBACK_MARKER};
pub use discovery::{find_candidates, ScriptCandidate};
pub use domain::{
    AecuError, ExecutionResult, ExecutionState, HistoryEntry, HistoryResult, HistoryState, Result,
};
pub use executor::ScriptExecutor;
pub use fallback::{fallback_path, get_fallback_script};
pub use history::HistoryManager;
pub use obs::{
    emit_batch_started, emit_fallback_triggered, emit_history_finalize_error,
    emit_history_finished, emit_script_executed, history_span,
};
pub use path_resolver::{is_folder, is_valid_script_name, matches_run_modes, PathResolver};
pub use service::AecuService;
pub use telemetry::{default_directives, init_tracing, LOG_ENV};

/// AECU version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
