//! Execution history entries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::execution::ExecutionResult;

/// Lifecycle state of a history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryState {
    Running,
    Finished,
}

impl HistoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryState::Running => "RUNNING",
            HistoryState::Finished => "FINISHED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "RUNNING" => Some(HistoryState::Running),
            "FINISHED" => Some(HistoryState::Finished),
            _ => None,
        }
    }
}

impl std::fmt::Display for HistoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryResult {
    Success,
    Failure,
    Unknown,
}

impl HistoryResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryResult::Success => "SUCCESS",
            HistoryResult::Failure => "FAILURE",
            HistoryResult::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SUCCESS" => Some(HistoryResult::Success),
            "FAILURE" => Some(HistoryResult::Failure),
            "UNKNOWN" => Some(HistoryResult::Unknown),
            _ => None,
        }
    }

    /// `Failure` if any result failed, otherwise `Success`.
    pub fn summarize(results: &[ExecutionResult]) -> Self {
        if results.iter().all(ExecutionResult::success) {
            HistoryResult::Success
        } else {
            HistoryResult::Failure
        }
    }
}

/// Persisted record of one batch run.
///
/// Results are append-only and may only be added while the entry is
/// `Running`. Mutation goes through [`crate::HistoryManager`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    path: String,
    state: HistoryState,
    result: HistoryResult,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    results: Vec<ExecutionResult>,
}

impl HistoryEntry {
    /// A fresh entry in state `Running`.
    pub(crate) fn begin(path: String, start: DateTime<Utc>) -> Self {
        Self {
            path,
            state: HistoryState::Running,
            result: HistoryResult::Unknown,
            start,
            end: None,
            results: Vec::new(),
        }
    }

    /// Rebuild an entry read back from the repository.
    pub(crate) fn restore(
        path: String,
        state: HistoryState,
        result: HistoryResult,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        results: Vec<ExecutionResult>,
    ) -> Self {
        Self {
            path,
            state,
            result,
            start,
            end,
            results,
        }
    }

    /// Repository path identifying this entry.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn result(&self) -> HistoryResult {
        self.result
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    pub fn is_running(&self) -> bool {
        self.state == HistoryState::Running
    }

    /// Wall time of the run, once finished.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    pub(crate) fn push_result(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    pub(crate) fn finish(&mut self, end: DateTime<Utc>, result: HistoryResult) {
        self.state = HistoryState::Finished;
        self.result = result;
        self.end = Some(end);
    }
}
