//! Repository node model and path helpers.
//!
//! Paths are absolute, `/`-separated and never end in `/` (except the root
//! itself). A node is a path plus its property map; children are obtained
//! through a [`crate::RepositorySession`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RepoResult, RepositoryError};

/// Property holding a node's primary type.
pub const JCR_PRIMARY_TYPE: &str = "jcr:primaryType";

/// Plain hierarchical folder.
pub const NT_FOLDER: &str = "nt:folder";
/// Generic folder.
pub const NT_SLING_FOLDER: &str = "sling:Folder";
/// Folder whose children keep an explicit order.
pub const NT_SLING_ORDERED_FOLDER: &str = "sling:OrderedFolder";
/// Leaf file node.
pub const NT_FILE: &str = "nt:file";
/// Schemaless node, used for intermediate and record nodes.
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

/// Property map of a node.
pub type Properties = BTreeMap<String, Value>;

/// A resolved repository node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    path: String,
    properties: Properties,
}

impl Node {
    pub fn new(path: impl Into<String>, properties: Properties) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Absolute path of this node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        name_of(&self.path)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// String-valued property, `None` if absent or of another type.
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(Value::as_str)
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.string_property(JCR_PRIMARY_TYPE)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Last segment of `path`.
pub fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Parent path of `path`, `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Join a child name onto a parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Validate and normalise an absolute path (a trailing `/` is dropped).
pub fn normalize(path: &str) -> RepoResult<String> {
    if !path.starts_with('/') {
        return Err(RepositoryError::InvalidPath {
            path: path.to_string(),
        });
    }
    if path == "/" {
        return Ok(path.to_string());
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed[1..].split('/').any(str::is_empty) {
        return Err(RepositoryError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
