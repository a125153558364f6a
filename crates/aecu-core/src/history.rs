//! History persistence: the RUNNING -> FINISHED lifecycle of a batch run.
//!
//! Layout below the history root:
//!
//! ```text
//! <root>/<yyyy>/<mm>/<dd>/<entry>          state, result, start, end
//! <root>/<yyyy>/<mm>/<dd>/<entry>/<n>      n-th stored execution result
//! <root>/<yyyy>/<mm>/<dd>/<entry>/<n>/fallback
//! ```
//!
//! Every transition is written and committed through the caller's session.
//! The in-memory entry is only updated after the commit succeeded.

use aecu_repository::node::join;
use aecu_repository::{
    Node, Properties, RepositorySession, JCR_PRIMARY_TYPE, NT_UNSTRUCTURED,
};
use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::AecuConfig;
use crate::domain::{
    AecuError, ExecutionResult, HistoryEntry, HistoryResult, HistoryState, Result,
};
use crate::obs;

const PN_STATE: &str = "state";
const PN_RESULT: &str = "result";
const PN_START: &str = "start";
const PN_END: &str = "end";
const PN_PATH: &str = "path";
const PN_SUCCESS: &str = "success";
const PN_RUN_TIME: &str = "runTime";
const PN_OUTPUT: &str = "output";
const PN_LOG: &str = "log";
const NN_FALLBACK: &str = "fallback";

/// Creates, appends to, finalizes and reads history entries.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    config: AecuConfig,
}

impl HistoryManager {
    pub fn new(config: AecuConfig) -> Self {
        Self { config }
    }

    /// Allocate and persist a new entry in state RUNNING.
    #[instrument(skip(self, session))]
    pub async fn create_history_entry(
        &self,
        session: &dyn RepositorySession,
    ) -> Result<HistoryEntry> {
        let start = Utc::now();
        let entry = HistoryEntry::begin(self.entry_path(start), start);

        let mut props = record_properties();
        props.insert(PN_STATE.to_string(), Value::from(entry.state().as_str()));
        props.insert(PN_RESULT.to_string(), Value::from(entry.result().as_str()));
        props.insert(PN_START.to_string(), Value::from(start.to_rfc3339()));
        session
            .write(entry.path(), props)
            .await
            .map_err(|e| AecuError::persistence("history entry", e))?;
        session
            .commit()
            .await
            .map_err(|e| AecuError::persistence("history entry", e))?;

        info!(entry = %entry.path(), "history entry created");
        Ok(entry)
    }

    /// Append `result` to a RUNNING entry and persist it.
    ///
    /// Rejects entries in any other state without touching them.
    #[instrument(skip(self, session, entry, result), fields(entry = %entry.path()))]
    pub async fn store_execution_in_history(
        &self,
        session: &dyn RepositorySession,
        entry: &mut HistoryEntry,
        result: ExecutionResult,
    ) -> Result<()> {
        ensure_running(entry)?;

        let result_path = join(entry.path(), &entry.results().len().to_string());
        write_result(session, &result_path, &result).await?;
        session
            .commit()
            .await
            .map_err(|e| AecuError::persistence("execution result", e))?;

        debug!(script = %result.path(), success = result.success(), "result stored");
        entry.push_result(result);
        Ok(())
    }

    /// Transition a RUNNING entry to FINISHED and persist it.
    ///
    /// The aggregate result is `Failure` if any stored result failed. Must
    /// be called exactly once per run; a second call fails with
    /// [`AecuError::InvalidHistoryState`].
    pub async fn finish_history_entry(
        &self,
        session: &dyn RepositorySession,
        entry: &mut HistoryEntry,
    ) -> Result<()> {
        let outcome = HistoryResult::summarize(entry.results());
        self.finish(session, entry, outcome).await
    }

    /// Finish a RUNNING entry as `Failure` regardless of its results, for
    /// batches stopped by a hard error.
    pub async fn abort_history_entry(
        &self,
        session: &dyn RepositorySession,
        entry: &mut HistoryEntry,
    ) -> Result<()> {
        self.finish(session, entry, HistoryResult::Failure).await
    }

    #[instrument(skip(self, session, entry), fields(entry = %entry.path()))]
    async fn finish(
        &self,
        session: &dyn RepositorySession,
        entry: &mut HistoryEntry,
        outcome: HistoryResult,
    ) -> Result<()> {
        ensure_running(entry)?;

        let mut finished = entry.clone();
        finished.finish(Utc::now(), outcome);

        let mut props = Properties::new();
        props.insert(PN_STATE.to_string(), Value::from(finished.state().as_str()));
        props.insert(PN_RESULT.to_string(), Value::from(finished.result().as_str()));
        if let Some(end) = finished.end() {
            props.insert(PN_END.to_string(), Value::from(end.to_rfc3339()));
        }
        session
            .write(finished.path(), props)
            .await
            .map_err(|e| AecuError::persistence("history entry", e))?;
        session
            .commit()
            .await
            .map_err(|e| AecuError::persistence("history entry", e))?;

        obs::emit_history_finished(
            finished.path(),
            finished.results().len(),
            finished.result().as_str(),
        );
        *entry = finished;
        Ok(())
    }

    /// Page through stored entries, newest first.
    #[instrument(skip(self, session))]
    pub async fn get_history(
        &self,
        session: &dyn RepositorySession,
        start_index: usize,
        count: usize,
    ) -> Result<Vec<HistoryEntry>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(root) = session.resolve(self.config.history_root()).await? else {
            return Ok(Vec::new());
        };

        let wanted = start_index.saturating_add(count);
        let mut nodes = Vec::new();
        // year -> month -> day -> entry
        collect_newest_first(session, root, 3, wanted, &mut nodes).await?;

        let mut entries = Vec::new();
        for node in nodes.into_iter().skip(start_index) {
            entries.push(read_entry(session, &node).await?);
        }
        Ok(entries)
    }

    fn entry_path(&self, start: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{:04}/{:02}/{:02}/{}-{}",
            self.config.history_root(),
            start.year(),
            start.month(),
            start.day(),
            start.format("%H%M%S%3f"),
            &id[..8]
        )
    }
}

fn ensure_running(entry: &HistoryEntry) -> Result<()> {
    if entry.is_running() {
        Ok(())
    } else {
        Err(AecuError::InvalidHistoryState {
            path: entry.path().to_string(),
            state: entry.state().to_string(),
        })
    }
}

fn record_properties() -> Properties {
    let mut props = Properties::new();
    props.insert(JCR_PRIMARY_TYPE.to_string(), Value::from(NT_UNSTRUCTURED));
    props
}

async fn write_result(
    session: &dyn RepositorySession,
    path: &str,
    result: &ExecutionResult,
) -> Result<()> {
    let records = std::iter::once((path.to_string(), result))
        .chain(result.fallback().map(|fb| (join(path, NN_FALLBACK), fb)));
    for (record_path, record) in records {
        let mut props = record_properties();
        props.insert(PN_PATH.to_string(), Value::from(record.path()));
        props.insert(PN_SUCCESS.to_string(), Value::from(record.success()));
        props.insert(PN_RESULT.to_string(), Value::from(record.state().as_str()));
        props.insert(PN_RUN_TIME.to_string(), Value::from(record.run_time_ms()));
        props.insert(PN_OUTPUT.to_string(), Value::from(record.output()));
        props.insert(PN_LOG.to_string(), Value::from(record.log()));
        session
            .write(&record_path, props)
            .await
            .map_err(|e| AecuError::persistence("execution result", e))?;
    }
    Ok(())
}

/// Depth-first walk collecting nodes `depth` levels below `node`, children
/// visited in descending name order, stopping once `limit` are collected.
async fn collect_newest_first(
    session: &dyn RepositorySession,
    node: Node,
    depth: usize,
    limit: usize,
    out: &mut Vec<Node>,
) -> Result<()> {
    let mut pending = vec![(node, depth)];
    while let Some((current, level)) = pending.pop() {
        let mut children = session.list_children(&current).await?;
        children.sort_by(|a, b| a.name().cmp(b.name()));
        if level == 0 {
            for child in children.into_iter().rev() {
                if out.len() >= limit {
                    return Ok(());
                }
                out.push(child);
            }
        } else {
            // Ascending push, so the newest child is popped first.
            pending.extend(children.into_iter().map(|c| (c, level - 1)));
        }
    }
    Ok(())
}

async fn read_entry(session: &dyn RepositorySession, node: &Node) -> Result<HistoryEntry> {
    let state = node
        .string_property(PN_STATE)
        .and_then(HistoryState::parse)
        .ok_or_else(|| corrupt(node, "missing state"))?;
    let result = node
        .string_property(PN_RESULT)
        .and_then(HistoryResult::parse)
        .unwrap_or(HistoryResult::Unknown);
    let start = timestamp(node, PN_START)?.ok_or_else(|| corrupt(node, "missing start"))?;
    let end = timestamp(node, PN_END)?;

    let mut indexed = Vec::new();
    for child in session.list_children(node).await? {
        if let Ok(index) = child.name().parse::<usize>() {
            indexed.push((index, child));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);

    let mut results = Vec::with_capacity(indexed.len());
    for (_, child) in indexed {
        let fallback = match session.resolve(&join(child.path(), NN_FALLBACK)).await? {
            Some(fallback_node) => Some(read_result(&fallback_node, None)?),
            None => None,
        };
        results.push(read_result(&child, fallback)?);
    }

    Ok(HistoryEntry::restore(
        node.path().to_string(),
        state,
        result,
        start,
        end,
        results,
    ))
}

fn read_result(node: &Node, fallback: Option<ExecutionResult>) -> Result<ExecutionResult> {
    let success = node
        .property(PN_SUCCESS)
        .and_then(Value::as_bool)
        .ok_or_else(|| corrupt(node, "missing success flag"))?;
    let run_time_ms = node
        .property(PN_RUN_TIME)
        .and_then(Value::as_u64)
        .unwrap_or_default();
    Ok(ExecutionResult::new(
        node.string_property(PN_PATH).unwrap_or_default(),
        success,
        run_time_ms,
        node.string_property(PN_OUTPUT).unwrap_or_default(),
        node.string_property(PN_LOG).unwrap_or_default(),
        fallback,
    ))
}

fn timestamp(node: &Node, key: &str) -> Result<Option<DateTime<Utc>>> {
    match node.string_property(key) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| corrupt(node, &format!("bad {key} timestamp: {e}"))),
        None => Ok(None),
    }
}

fn corrupt(node: &Node, reason: &str) -> AecuError {
    AecuError::CorruptHistory {
        path: node.path().to_string(),
        reason: reason.to_string(),
    }
}
