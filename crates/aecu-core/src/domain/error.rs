//! Error taxonomy for AECU.

use aecu_repository::RepositoryError;

/// AECU errors.
///
/// Every variant carries a message; variants wrapping a [`RepositoryError`]
/// expose it as the cause via `source()`.
#[derive(Debug, thiserror::Error)]
pub enum AecuError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("unable to get repository session")]
    Login(#[source] RepositoryError),

    #[error("unable to persist {what}")]
    Persistence {
        what: String,
        #[source]
        source: RepositoryError,
    },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid script name: {0}")]
    InvalidScriptName(String),

    #[error("history entry {path} is {state}, expected RUNNING")]
    InvalidHistoryState { path: String, state: String },

    #[error("corrupt history record at {path}: {reason}")]
    CorruptHistory { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AecuError {
    pub(crate) fn persistence(what: impl Into<String>, source: RepositoryError) -> Self {
        AecuError::Persistence {
            what: what.into(),
            source,
        }
    }
}

/// Result type for AECU operations.
pub type Result<T> = std::result::Result<T, AecuError>;
