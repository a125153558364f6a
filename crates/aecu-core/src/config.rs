//! Core configuration.

use crate::domain::{AecuError, Result};

/// Suffix identifying script nodes unless overridden.
pub const DEFAULT_SCRIPT_EXTENSION: &str = ".groovy";

/// Repository folder holding execution history unless overridden.
pub const DEFAULT_HISTORY_ROOT: &str = "/var/aecu";

/// Name segment marking a fallback script. Not configurable.
pub const FALLBACK_MARKER: &str = ".fallback.";

/// Settings shared by all AECU components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AecuConfig {
    /// Script file extension including the leading dot.
    pub script_extension: String,
    /// Absolute repository path under which history entries are stored.
    pub history_root: String,
}

impl Default for AecuConfig {
    fn default() -> Self {
        Self {
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            history_root: DEFAULT_HISTORY_ROOT.to_string(),
        }
    }
}

impl AecuConfig {
    /// Set a custom script extension
    pub fn with_script_extension(mut self, ext: impl Into<String>) -> Self {
        self.script_extension = ext.into();
        self
    }

    /// Set a custom history root
    pub fn with_history_root(mut self, root: impl Into<String>) -> Self {
        self.history_root = root.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - AECU_SCRIPT_EXTENSION (optional, default: ".groovy")
    /// - AECU_HISTORY_ROOT (optional, default: "/var/aecu")
    pub fn from_env() -> Result<Self> {
        let mut config = AecuConfig::default();
        if let Ok(ext) = std::env::var("AECU_SCRIPT_EXTENSION") {
            config.script_extension = ext;
        }
        if let Ok(root) = std::env::var("AECU_HISTORY_ROOT") {
            config.history_root = root;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject extensions without a leading dot and relative history roots.
    pub fn validate(&self) -> Result<()> {
        if self.script_extension.len() < 2 || !self.script_extension.starts_with('.') {
            return Err(AecuError::Config(format!(
                "script extension must start with '.': {:?}",
                self.script_extension
            )));
        }
        if !self.history_root.starts_with('/') || self.history_root.len() < 2 {
            return Err(AecuError::Config(format!(
                "history root must be an absolute, non-root path: {:?}",
                self.history_root
            )));
        }
        Ok(())
    }

    /// History root without a trailing slash.
    pub(crate) fn history_root(&self) -> &str {
        self.history_root.trim_end_matches('/')
    }
}
