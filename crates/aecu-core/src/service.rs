//! AECU service: the public entry point.
//!
//! Every operation acquires its own repository session and releases it on
//! every exit path (the session is dropped at the end of the call). Sessions
//! are never shared between operations, so each operation commits at most
//! one unit of work.

use std::sync::Arc;

use aecu_repository::{RepositorySession, RunModeProvider, ScriptInterpreter, SessionFactory};
use tracing::{info, instrument, Instrument};

use crate::config::AecuConfig;
use crate::discovery::{find_candidates, ScriptCandidate};
use crate::domain::{AecuError, ExecutionResult, HistoryEntry, Result};
use crate::executor::ScriptExecutor;
use crate::history::HistoryManager;
use crate::obs;
use crate::path_resolver::PathResolver;

/// Discovers, executes and records upgrade scripts.
///
/// Not internally synchronised across runs: callers needing at most one
/// concurrent batch per script root must serialise externally.
pub struct AecuService {
    sessions: Arc<dyn SessionFactory>,
    run_modes: Arc<dyn RunModeProvider>,
    interpreter: Arc<dyn ScriptInterpreter>,
    history: HistoryManager,
    config: AecuConfig,
    version: String,
}

impl AecuService {
    /// Build the service. Fails with [`AecuError::Config`] if `config` does
    /// not validate.
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        run_modes: Arc<dyn RunModeProvider>,
        interpreter: Arc<dyn ScriptInterpreter>,
        config: AecuConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sessions,
            run_modes,
            interpreter,
            history: HistoryManager::new(config.clone()),
            config,
            version: crate::VERSION.to_string(),
        })
    }

    /// Override the reported component version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Build/release identifier of the running component.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn config(&self) -> &AecuConfig {
        &self.config
    }

    async fn session(&self) -> Result<Box<dyn RepositorySession>> {
        self.sessions.login().await.map_err(AecuError::Login)
    }

    /// Script paths below `path` that apply to the active run modes, in
    /// execution order.
    #[instrument(skip(self))]
    pub async fn get_files(&self, path: &str) -> Result<Vec<String>> {
        let session = self.session().await?;
        let run_modes = self.run_modes.active_run_modes();
        let resolver = PathResolver::new(session.as_ref(), &run_modes, &self.config);
        let candidates = find_candidates(&resolver, path).await?;
        Ok(candidates
            .into_iter()
            .map(ScriptCandidate::into_string)
            .collect())
    }

    /// Execute one script (and its fallback if it fails).
    #[instrument(skip(self))]
    pub async fn execute(&self, path: &str) -> Result<ExecutionResult> {
        let session = self.session().await?;
        let run_modes = self.run_modes.active_run_modes();
        let resolver = PathResolver::new(session.as_ref(), &run_modes, &self.config);
        ScriptExecutor::new(self.interpreter.as_ref())
            .execute(&resolver, path)
            .await
    }

    /// Start a new history entry (state RUNNING).
    pub async fn create_history_entry(&self) -> Result<HistoryEntry> {
        let session = self.session().await?;
        self.history.create_history_entry(session.as_ref()).await
    }

    /// Append a result to a RUNNING history entry.
    pub async fn store_execution_in_history(
        &self,
        entry: &mut HistoryEntry,
        result: ExecutionResult,
    ) -> Result<()> {
        let session = self.session().await?;
        self.history
            .store_execution_in_history(session.as_ref(), entry, result)
            .await
    }

    /// Finish a RUNNING history entry. Call exactly once per run.
    pub async fn finish_history_entry(&self, entry: &mut HistoryEntry) -> Result<()> {
        let session = self.session().await?;
        self.history
            .finish_history_entry(session.as_ref(), entry)
            .await
    }

    async fn abort_history_entry(&self, entry: &mut HistoryEntry) -> Result<()> {
        let session = self.session().await?;
        self.history
            .abort_history_entry(session.as_ref(), entry)
            .await
    }

    /// Stored history entries, newest first.
    pub async fn get_history(&self, start_index: usize, count: usize) -> Result<Vec<HistoryEntry>> {
        let session = self.session().await?;
        self.history
            .get_history(session.as_ref(), start_index, count)
            .await
    }

    /// Run every applicable script below `path` and record the batch.
    ///
    /// Scripts run strictly sequentially in discovery order. A script that
    /// throws is recorded as failed and the batch continues. A hard error
    /// (repository, persistence) stops the batch: the entry is finished as
    /// `Failure` where possible and the error is returned.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, path: &str) -> Result<HistoryEntry> {
        let candidates = self.get_files(path).await?;
        let entry = self.create_history_entry().await?;
        let span = obs::history_span(entry.path());
        self.record_batch(entry, path, &candidates)
            .instrument(span)
            .await
    }

    async fn record_batch(
        &self,
        mut entry: HistoryEntry,
        path: &str,
        candidates: &[String],
    ) -> Result<HistoryEntry> {
        obs::emit_batch_started(entry.path(), path, candidates.len());
        if let Err(err) = self.execute_all(&mut entry, candidates).await {
            if let Err(finish_err) = self.abort_history_entry(&mut entry).await {
                obs::emit_history_finalize_error(entry.path(), &finish_err);
            }
            return Err(err);
        }
        self.finish_history_entry(&mut entry).await?;
        info!(outcome = entry.result().as_str(), "batch finished");
        Ok(entry)
    }

    async fn execute_all(&self, entry: &mut HistoryEntry, candidates: &[String]) -> Result<()> {
        for candidate in candidates {
            let result = self.execute(candidate).await?;
            self.store_execution_in_history(entry, result).await?;
        }
        Ok(())
    }
}
