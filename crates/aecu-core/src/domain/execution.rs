//! Script execution results.

use serde::{Deserialize, Serialize};

/// Outcome classification of a single script run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    Success,
    Failure,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Success => "SUCCESS",
            ExecutionState::Failure => "FAILURE",
        }
    }
}

/// Immutable record of one script invocation.
///
/// `success`, `output` and `log` always describe the script at `path`. When
/// that script failed and a fallback ran, the fallback's own record is nested
/// in `fallback` (never more than one level deep).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    path: String,
    success: bool,
    run_time_ms: u64,
    output: String,
    log: String,
    fallback: Option<Box<ExecutionResult>>,
}

impl ExecutionResult {
    pub fn new(
        path: impl Into<String>,
        success: bool,
        run_time_ms: u64,
        output: impl Into<String>,
        log: impl Into<String>,
        fallback: Option<ExecutionResult>,
    ) -> Self {
        Self {
            path: path.into(),
            success,
            run_time_ms,
            output: output.into(),
            log: log.into(),
            fallback: fallback.map(Box::new),
        }
    }

    /// Repository path of the script that ran.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn state(&self) -> ExecutionState {
        if self.success {
            ExecutionState::Success
        } else {
            ExecutionState::Failure
        }
    }

    pub fn run_time_ms(&self) -> u64 {
        self.run_time_ms
    }

    /// The script's return value as text.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Printed output followed by the exception trace, if any.
    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn fallback(&self) -> Option<&ExecutionResult> {
        self.fallback.as_deref()
    }
}
