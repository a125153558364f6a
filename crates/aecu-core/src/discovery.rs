//! Script discovery: depth-first, pre-order walk of a script tree.
//!
//! A folder whose name fails the run-mode match is pruned entirely. Nodes
//! that are neither matching folders nor valid scripts are skipped without
//! error (co-located assets such as README files are expected).

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{AecuError, Result};
use crate::path_resolver::PathResolver;

/// Repository path of a script eligible for execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptCandidate(String);

impl ScriptCandidate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ScriptCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collect all candidates below (or at) `path`, in execution order.
///
/// Fails with [`AecuError::InvalidPath`] if `path` is empty or does not
/// resolve to a node.
#[instrument(skip(resolver))]
pub async fn find_candidates(
    resolver: &PathResolver<'_>,
    path: &str,
) -> Result<Vec<ScriptCandidate>> {
    if path.trim().is_empty() {
        return Err(AecuError::InvalidPath("Path is empty".to_string()));
    }
    let root = resolver
        .resolve(path)
        .await?
        .ok_or_else(|| AecuError::InvalidPath(format!("Path is invalid: {path}")))?;

    let mut candidates = Vec::new();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if resolver.is_folder(&node) {
            if !resolver.matches_run_modes(node.name()) {
                debug!(folder = %node.path(), "run modes do not match, pruning");
                continue;
            }
            let children = resolver.children(&node).await?;
            // Reversed so the first child is popped first.
            pending.extend(children.into_iter().rev());
        } else if resolver.is_valid_script_name(node.name()) {
            candidates.push(ScriptCandidate(node.path().to_string()));
        } else {
            debug!(node = %node.path(), "not a script, skipping");
        }
    }

    debug!(count = candidates.len(), "discovered scripts");
    Ok(candidates)
}
