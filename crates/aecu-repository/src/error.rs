//! Error types for aecu-repository

use thiserror::Error;

/// Errors raised by the repository collaborators
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Session could not be acquired
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// No node at the given path
    #[error("Node not found: {path}")]
    NotFound { path: String },

    /// Path is not absolute or contains empty segments
    #[error("Invalid repository path: {path}")]
    InvalidPath { path: String },

    /// Staged changes could not be persisted
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Property value could not be converted
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;
