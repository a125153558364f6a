//! Collaborator contracts consumed by the AECU core
//!
//! These traits define the boundaries of the core:
//! - `SessionFactory` / `RepositorySession`: scoped access to the content tree
//! - `ScriptInterpreter`: runs one script, reports a structured outcome
//! - `RunModeProvider`: the host's active run modes
//!
//! All traits are backend-agnostic. In-memory fakes are provided for testing
//! via the `fakes` module.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RepoResult;
use crate::node::{Node, Properties};

// ---------------------------------------------------------------------------
// Repository sessions
// ---------------------------------------------------------------------------

/// A scoped repository session.
///
/// Guarantees:
/// - `list_children` preserves the repository's natural child order.
/// - `write` is staged; nothing is visible to other sessions before `commit`.
/// - Dropping the session releases it (logout) and discards uncommitted writes.
#[async_trait]
pub trait RepositorySession: Send + Sync {
    /// Resolve a node by absolute path. `Ok(None)` if no such node exists.
    async fn resolve(&self, path: &str) -> RepoResult<Option<Node>>;

    /// Direct children of `node`, in natural order.
    async fn list_children(&self, node: &Node) -> RepoResult<Vec<Node>>;

    /// Create the node at `path` or merge `properties` into it. Missing
    /// ancestors are created as `nt:unstructured`.
    async fn write(&self, path: &str, properties: Properties) -> RepoResult<Node>;

    /// Persist all staged writes as one unit.
    async fn commit(&self) -> RepoResult<()>;
}

/// Hands out fresh sessions. Sessions are never pooled or reused.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Acquire a new session. Fails with `RepositoryError::LoginFailed`.
    async fn login(&self) -> RepoResult<Box<dyn RepositorySession>>;
}

// ---------------------------------------------------------------------------
// Script interpreter
// ---------------------------------------------------------------------------

/// Raw outcome of one interpreter invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRun {
    /// Textual form of the script's return value.
    pub result: String,
    /// Everything the script printed.
    pub output: String,
    /// Stack trace of an uncaught script error, if any.
    pub exception_trace: Option<String>,
    /// Wall time spent in the script.
    pub elapsed_ms: u64,
}

impl ScriptRun {
    /// A run without an exception trace (a blank trace counts as none).
    pub fn is_success(&self) -> bool {
        self.exception_trace
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Executes script text stored at a repository path.
///
/// Script-level errors never surface as `Err`; they are reported through
/// `ScriptRun::exception_trace`.
#[async_trait]
pub trait ScriptInterpreter: Send + Sync {
    async fn run(&self, session: &dyn RepositorySession, path: &str) -> ScriptRun;
}

// ---------------------------------------------------------------------------
// Run modes
// ---------------------------------------------------------------------------

/// Environment variable read by [`StaticRunModes::from_env`].
pub const RUN_MODES_ENV: &str = "AECU_RUN_MODES";

/// Unordered set of active run-mode tags (e.g. "author", "publish", "dev").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunModeSet(BTreeSet<String>);

impl RunModeSet {
    pub fn new<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunModeSet(modes.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.0.contains(mode)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl std::fmt::Display for RunModeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let modes: Vec<&str> = self.iter().collect();
        write!(f, "{}", modes.join(","))
    }
}

/// Source of the host's active run modes. Read-only.
pub trait RunModeProvider: Send + Sync {
    fn active_run_modes(&self) -> RunModeSet;
}

/// Fixed run modes supplied at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticRunModes(RunModeSet);

impl StaticRunModes {
    pub fn new<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticRunModes(RunModeSet::new(modes))
    }

    /// Read comma-separated modes from `AECU_RUN_MODES`. Unset means none.
    pub fn from_env() -> Self {
        let raw = std::env::var(RUN_MODES_ENV).unwrap_or_default();
        Self::parse(&raw)
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn parse(raw: &str) -> Self {
        StaticRunModes::new(
            raw.split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        )
    }
}

impl RunModeProvider for StaticRunModes {
    fn active_run_modes(&self) -> RunModeSet {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_run_success_when_trace_blank() {
        let mut run = ScriptRun::default();
        assert!(run.is_success());
        run.exception_trace = Some("   \n".to_string());
        assert!(run.is_success());
        run.exception_trace = Some("java.lang.NullPointerException".to_string());
        assert!(!run.is_success());
    }

    #[test]
    fn test_static_run_modes_parse() {
        let modes = StaticRunModes::parse(" author, dev ,,").active_run_modes();
        assert!(modes.contains("author"));
        assert!(modes.contains("dev"));
        assert!(!modes.contains(""));
        assert_eq!(modes.to_string(), "author,dev");
    }
}
