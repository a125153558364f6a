//! Node classification: folders, run-mode constrained folder names and
//! script names.
//!
//! A folder name may carry run-mode constraints after its first `.`:
//! `;` separates alternatives, `.` joins modes that must all be active.
//! `install.author;publish.dev` applies on `author`, or on `publish`+`dev`.

use aecu_repository::{
    Node, RepositorySession, RunModeSet, NT_FOLDER, NT_SLING_FOLDER, NT_SLING_ORDERED_FOLDER,
};

use crate::config::{AecuConfig, FALLBACK_MARKER};
use crate::domain::Result;

/// True iff the node's primary type is one of the recognised folder types.
pub fn is_folder(node: &Node) -> bool {
    matches!(
        node.primary_type(),
        Some(NT_SLING_FOLDER) | Some(NT_SLING_ORDERED_FOLDER) | Some(NT_FOLDER)
    )
}

/// True iff `name` carries no run-mode suffix, or at least one of its
/// run-mode combinations is fully contained in `active`.
pub fn matches_run_modes(name: &str, active: &RunModeSet) -> bool {
    let Some((_, suffix)) = name.split_once('.') else {
        return true;
    };
    suffix.split(';').any(|combination| {
        combination
            .split('.')
            .all(|mode| !mode.is_empty() && active.contains(mode))
    })
}

/// True iff `name` ends in `extension` and is not a fallback script.
pub fn is_valid_script_name(name: &str, extension: &str) -> bool {
    name.ends_with(extension) && !name.contains(FALLBACK_MARKER)
}

/// Classifies nodes reachable through one repository session.
pub struct PathResolver<'a> {
    session: &'a dyn RepositorySession,
    run_modes: &'a RunModeSet,
    config: &'a AecuConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        session: &'a dyn RepositorySession,
        run_modes: &'a RunModeSet,
        config: &'a AecuConfig,
    ) -> Self {
        Self {
            session,
            run_modes,
            config,
        }
    }

    pub fn session(&self) -> &'a dyn RepositorySession {
        self.session
    }

    pub fn config(&self) -> &'a AecuConfig {
        self.config
    }

    pub async fn resolve(&self, path: &str) -> Result<Option<Node>> {
        Ok(self.session.resolve(path).await?)
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).await?.is_some())
    }

    pub async fn children(&self, node: &Node) -> Result<Vec<Node>> {
        Ok(self.session.list_children(node).await?)
    }

    pub fn is_folder(&self, node: &Node) -> bool {
        is_folder(node)
    }

    pub fn matches_run_modes(&self, name: &str) -> bool {
        matches_run_modes(name, self.run_modes)
    }

    pub fn is_valid_script_name(&self, name: &str) -> bool {
        is_valid_script_name(name, &self.config.script_extension)
    }
}
