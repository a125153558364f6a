//! Script execution through the external interpreter.

use aecu_repository::node::name_of;
use aecu_repository::{ScriptInterpreter, ScriptRun};
use tracing::instrument;

use crate::domain::{AecuError, ExecutionResult, Result};
use crate::fallback::get_fallback_script;
use crate::obs;
use crate::path_resolver::PathResolver;

/// Runs single scripts and, on failure, their fallback.
pub struct ScriptExecutor<'a> {
    interpreter: &'a dyn ScriptInterpreter,
}

impl<'a> ScriptExecutor<'a> {
    pub fn new(interpreter: &'a dyn ScriptInterpreter) -> Self {
        Self { interpreter }
    }

    /// Execute the script at `path`.
    ///
    /// Fails with [`AecuError::InvalidScriptName`] if the leaf name is not a
    /// runnable script and with [`AecuError::InvalidPath`] if no node exists.
    /// A script that throws is not an error: it yields `success == false`.
    #[instrument(skip(self, resolver))]
    pub async fn execute(&self, resolver: &PathResolver<'_>, path: &str) -> Result<ExecutionResult> {
        if !resolver.is_valid_script_name(name_of(path)) {
            return Err(AecuError::InvalidScriptName(path.to_string()));
        }
        if !resolver.exists(path).await? {
            return Err(AecuError::InvalidPath(format!("Path is invalid: {path}")));
        }
        self.execute_script(resolver, path).await
    }

    async fn execute_script(&self, resolver: &PathResolver<'_>, path: &str) -> Result<ExecutionResult> {
        let run = self.interpreter.run(resolver.session(), path).await;
        obs::emit_script_executed(path, run.is_success(), run.elapsed_ms);

        let fallback = if run.is_success() {
            None
        } else {
            match get_fallback_script(resolver, path).await? {
                Some(fallback_path) => {
                    obs::emit_fallback_triggered(path, &fallback_path);
                    // A fallback path carries the marker, so it has no fallback itself.
                    let fallback_run = self.interpreter.run(resolver.session(), &fallback_path).await;
                    obs::emit_script_executed(
                        &fallback_path,
                        fallback_run.is_success(),
                        fallback_run.elapsed_ms,
                    );
                    Some(to_result(&fallback_path, fallback_run, None))
                }
                None => None,
            }
        };

        Ok(to_result(path, run, fallback))
    }
}

fn to_result(path: &str, run: ScriptRun, fallback: Option<ExecutionResult>) -> ExecutionResult {
    let success = run.is_success();
    let mut log = run.output;
    if let Some(trace) = run.exception_trace {
        log.push_str(&trace);
    }
    ExecutionResult::new(path, success, run.elapsed_ms, run.result, log, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AecuConfig;
    use aecu_repository::fakes::{MemoryRepository, ScriptedInterpreter};
    use aecu_repository::{RunModeSet, SessionFactory};

    async fn run(
        repo: &MemoryRepository,
        interpreter: &ScriptedInterpreter,
        path: &str,
    ) -> Result<ExecutionResult> {
        let session = repo.login().await.unwrap();
        let run_modes = RunModeSet::default();
        let config = AecuConfig::default();
        let resolver = PathResolver::new(session.as_ref(), &run_modes, &config);
        ScriptExecutor::new(interpreter).execute(&resolver, path).await
    }

    #[tokio::test]
    async fn test_successful_script() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.groovy", "").unwrap();
        let interpreter = ScriptedInterpreter::new().succeeding("/s/a.groovy", "42");

        let result = run(&repo, &interpreter, "/s/a.groovy").await.unwrap();
        assert!(result.success());
        assert_eq!(result.output(), "42");
        assert_eq!(result.log(), "running /s/a.groovy\n");
        assert!(result.fallback().is_none());
    }

    #[tokio::test]
    async fn test_failure_runs_fallback() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.groovy", "").unwrap();
        repo.add_file("/s/a.fallback.groovy", "").unwrap();
        let interpreter = ScriptedInterpreter::new()
            .failing("/s/a.groovy", "boom")
            .succeeding("/s/a.fallback.groovy", "restored");

        let result = run(&repo, &interpreter, "/s/a.groovy").await.unwrap();
        assert!(!result.success());
        assert!(result.log().ends_with("boom"));
        let fallback = result.fallback().expect("fallback ran");
        assert!(fallback.success());
        assert_eq!(fallback.path(), "/s/a.fallback.groovy");
        assert_eq!(fallback.output(), "restored");
        assert_eq!(
            interpreter.calls(),
            vec!["/s/a.groovy", "/s/a.fallback.groovy"]
        );
    }

    #[tokio::test]
    async fn test_failing_fallback_is_not_chained() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.groovy", "").unwrap();
        repo.add_file("/s/a.fallback.groovy", "").unwrap();
        let interpreter = ScriptedInterpreter::new()
            .failing("/s/a.groovy", "boom")
            .failing("/s/a.fallback.groovy", "still broken");

        let result = run(&repo, &interpreter, "/s/a.groovy").await.unwrap();
        let fallback = result.fallback().expect("fallback ran");
        assert!(!fallback.success());
        assert!(fallback.fallback().is_none());
        assert_eq!(interpreter.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_fallback() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.groovy", "").unwrap();
        let interpreter = ScriptedInterpreter::new().failing("/s/a.groovy", "boom");

        let result = run(&repo, &interpreter, "/s/a.groovy").await.unwrap();
        assert!(!result.success());
        assert!(result.fallback().is_none());
    }

    #[tokio::test]
    async fn test_rejects_invalid_name_and_missing_node() {
        let repo = MemoryRepository::new();
        repo.add_file("/s/a.fallback.groovy", "").unwrap();
        let interpreter = ScriptedInterpreter::new();

        let err = run(&repo, &interpreter, "/s/a.fallback.groovy").await.unwrap_err();
        assert!(matches!(err, AecuError::InvalidScriptName(_)));
        let err = run(&repo, &interpreter, "/s/readme.txt").await.unwrap_err();
        assert!(matches!(err, AecuError::InvalidScriptName(_)));
        let err = run(&repo, &interpreter, "/s/missing.groovy").await.unwrap_err();
        assert!(matches!(err, AecuError::InvalidPath(_)));
        assert!(interpreter.calls().is_empty());
    }
}
