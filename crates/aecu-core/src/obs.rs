//! Structured observability hooks for AECU batch runs.
//!
//! This module provides:
//! - History-scoped tracing spans via `history_span`
//! - Emission functions for key lifecycle events: batch start, script run,
//!   fallback, history finish
//!
//! Events are emitted at `info!` level (filter with `AECU_LOG` or `RUST_LOG`).

use tracing::info;

/// Span tagging everything inside a batch run with its history entry.
///
/// # Example
///
/// ```ignore
/// use tracing::Instrument;
/// run_scripts().instrument(history_span("/var/aecu/2026/10/19/101500123-ab12cd34")).await;
/// ```
pub fn history_span(history_entry: &str) -> tracing::Span {
    tracing::info_span!("aecu.batch", history_entry = %history_entry)
}

/// Emit event: batch started for a script root with a number of candidates.
pub fn emit_batch_started(history_entry: &str, script_root: &str, candidates: usize) {
    info!(
        event = "batch.started",
        history_entry = %history_entry,
        script_root = %script_root,
        candidates = candidates,
    );
}

/// Emit event: a script ran (directly or as fallback).
pub fn emit_script_executed(path: &str, success: bool, run_time_ms: u64) {
    info!(
        event = "script.executed",
        path = %path,
        success = success,
        run_time_ms = run_time_ms,
    );
}

/// Emit event: a failed script is handed over to its fallback.
pub fn emit_fallback_triggered(path: &str, fallback: &str) {
    info!(event = "script.fallback", path = %path, fallback = %fallback);
}

/// Emit event: history entry finished with its aggregate result.
pub fn emit_history_finished(history_entry: &str, results: usize, outcome: &str) {
    info!(
        event = "history.finished",
        history_entry = %history_entry,
        results = results,
        outcome = %outcome,
    );
}

/// Emit event: history entry could not be finalized (warning level).
pub fn emit_history_finalize_error(history_entry: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "history.finalize_error", history_entry = %history_entry, error = %error);
}
