//! AECU Repository: collaborator contracts for the AECU core
//!
//! This crate defines everything the core consumes but does not implement:
//! scoped repository sessions, the script interpreter and the host's run
//! modes. It owns no persistence of its own.
//!
//! ## Layer 0 - Collaborators
//!
//! Focus: narrow async traits and a plain node model.
//!
//! ## Key Components
//!
//! - `SessionFactory` / `RepositorySession`: login, resolve, list, write, commit
//! - `ScriptInterpreter` / `ScriptRun`: script path in, structured outcome out
//! - `RunModeProvider` / `RunModeSet`: active deployment run modes
//! - `fakes`: in-memory implementations for tests

pub mod contracts;
mod error;
pub mod fakes;
pub mod node;

pub use contracts::{
    RepositorySession, RunModeProvider, RunModeSet, ScriptInterpreter, ScriptRun,
    SessionFactory, StaticRunModes, RUN_MODES_ENV,
};
pub use error::{RepoResult, RepositoryError};
pub use node::{
    Node, Properties, JCR_PRIMARY_TYPE, NT_FILE, NT_FOLDER, NT_SLING_FOLDER,
    NT_SLING_ORDERED_FOLDER, NT_UNSTRUCTURED,
};
