//! In-memory fakes for the collaborator contracts (testing only)
//!
//! Provides `MemoryRepository` (a `SessionFactory` over an in-memory tree)
//! and `ScriptedInterpreter` (canned outcomes per script path) that satisfy
//! the trait contracts without any external dependencies.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::contracts::*;
use crate::error::{RepoResult, RepositoryError};
use crate::node::*;

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct NodeData {
    properties: Properties,
    children: Vec<String>,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: BTreeMap<String, NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        let mut root = NodeData::default();
        root.properties
            .insert(JCR_PRIMARY_TYPE.to_string(), Value::from("rep:root"));
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), root);
        Tree { nodes }
    }
}

impl Tree {
    fn get(&self, path: &str) -> Option<Node> {
        self.nodes
            .get(path)
            .map(|data| Node::new(path, data.properties.clone()))
    }

    fn children(&self, path: &str) -> Vec<Node> {
        self.nodes
            .get(path)
            .map(|data| {
                data.children
                    .iter()
                    .filter_map(|child| self.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create `path` (and missing ancestors) or merge into the existing node.
    fn upsert(&mut self, path: &str, properties: Properties) -> Node {
        if !self.nodes.contains_key(path) {
            if let Some(parent) = parent_of(path).map(str::to_string) {
                if !self.nodes.contains_key(&parent) {
                    self.upsert(&parent, Properties::new());
                }
                if let Some(parent_data) = self.nodes.get_mut(&parent) {
                    parent_data.children.push(path.to_string());
                }
            }
            let mut data = NodeData::default();
            data.properties
                .insert(JCR_PRIMARY_TYPE.to_string(), Value::from(NT_UNSTRUCTURED));
            self.nodes.insert(path.to_string(), data);
        }
        let data = self
            .nodes
            .entry(path.to_string())
            .or_default();
        data.properties.extend(properties);
        Node::new(path, data.properties.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Shared {
    tree: Mutex<Tree>,
    open_sessions: AtomicUsize,
    logins: AtomicUsize,
    commits: AtomicUsize,
    fail_login: AtomicBool,
    fail_commit: AtomicBool,
    fail_next_commits: AtomicUsize,
}

/// In-memory content repository. Cloning shares the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    shared: Arc<Shared>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a folder of the given primary type (ancestors are created).
    pub fn add_folder_of_type(&self, path: &str, primary_type: &str) -> RepoResult<Node> {
        let mut props = Properties::new();
        props.insert(JCR_PRIMARY_TYPE.to_string(), Value::from(primary_type));
        self.add_node(path, props)
    }

    /// Add a `sling:Folder`.
    pub fn add_folder(&self, path: &str) -> RepoResult<Node> {
        self.add_folder_of_type(path, NT_SLING_FOLDER)
    }

    /// Add an `nt:file` leaf holding `content`.
    pub fn add_file(&self, path: &str, content: &str) -> RepoResult<Node> {
        let mut props = Properties::new();
        props.insert(JCR_PRIMARY_TYPE.to_string(), Value::from(NT_FILE));
        props.insert("content".to_string(), Value::from(content));
        self.add_node(path, props)
    }

    /// Write a node straight into the committed tree.
    pub fn add_node(&self, path: &str, properties: Properties) -> RepoResult<Node> {
        let path = normalize(path)?;
        let mut tree = self.shared.tree.lock().unwrap();
        Ok(tree.upsert(&path, properties))
    }

    /// Committed view of a node.
    pub fn node(&self, path: &str) -> Option<Node> {
        self.shared.tree.lock().unwrap().get(path)
    }

    /// Committed view of a node's children.
    pub fn children(&self, path: &str) -> Vec<Node> {
        self.shared.tree.lock().unwrap().children(path)
    }

    /// Sessions currently alive (acquired and not yet dropped).
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    pub fn login_count(&self) -> usize {
        self.shared.logins.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// Make subsequent logins fail.
    pub fn set_fail_login(&self, fail: bool) {
        self.shared.fail_login.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent commits fail.
    pub fn set_fail_commit(&self, fail: bool) {
        self.shared.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Make only the next commit fail.
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commits.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionFactory for MemoryRepository {
    async fn login(&self) -> RepoResult<Box<dyn RepositorySession>> {
        if self.shared.fail_login.load(Ordering::SeqCst) {
            return Err(RepositoryError::LoginFailed(
                "memory repository refuses logins".to_string(),
            ));
        }
        self.shared.logins.fetch_add(1, Ordering::SeqCst);
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
            staged: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
        }))
    }
}

/// Session over a [`MemoryRepository`].
///
/// Reads see the committed tree plus this session's own staged writes.
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
    staged: Mutex<Option<Tree>>,
    writes: Mutex<Vec<(String, Properties)>>,
}

impl MemorySession {
    fn read<T>(&self, f: impl FnOnce(&Tree) -> T) -> T {
        let staged = self.staged.lock().unwrap();
        match staged.as_ref() {
            Some(tree) => f(tree),
            None => f(&*self.shared.tree.lock().unwrap()),
        }
    }
}

#[async_trait]
impl RepositorySession for MemorySession {
    async fn resolve(&self, path: &str) -> RepoResult<Option<Node>> {
        let Ok(path) = normalize(path) else {
            return Ok(None);
        };
        Ok(self.read(|tree| tree.get(&path)))
    }

    async fn list_children(&self, node: &Node) -> RepoResult<Vec<Node>> {
        if self.read(|tree| tree.get(node.path())).is_none() {
            return Err(RepositoryError::NotFound {
                path: node.path().to_string(),
            });
        }
        Ok(self.read(|tree| tree.children(node.path())))
    }

    async fn write(&self, path: &str, properties: Properties) -> RepoResult<Node> {
        let path = normalize(path)?;
        let mut staged = self.staged.lock().unwrap();
        let tree = staged.get_or_insert_with(|| self.shared.tree.lock().unwrap().clone());
        let node = tree.upsert(&path, properties.clone());
        self.writes.lock().unwrap().push((path, properties));
        Ok(node)
    }

    async fn commit(&self) -> RepoResult<()> {
        let one_shot = self
            .shared
            .fail_next_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if one_shot || self.shared.fail_commit.load(Ordering::SeqCst) {
            return Err(RepositoryError::Commit(
                "memory repository refuses commits".to_string(),
            ));
        }
        let writes = std::mem::take(&mut *self.writes.lock().unwrap());
        {
            let mut tree = self.shared.tree.lock().unwrap();
            for (path, properties) in &writes {
                tree.upsert(path, properties.clone());
            }
        }
        *self.staged.lock().unwrap() = None;
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        debug!(writes = writes.len(), "memory session committed");
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// ScriptedInterpreter
// ---------------------------------------------------------------------------

/// Interpreter returning canned [`ScriptRun`]s keyed by script path.
///
/// Paths without a registered outcome fail with a missing-script trace.
/// Every invocation is recorded in call order.
#[derive(Debug, Default)]
pub struct ScriptedInterpreter {
    outcomes: Mutex<HashMap<String, ScriptRun>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(self, path: &str, run: ScriptRun) -> Self {
        self.outcomes.lock().unwrap().insert(path.to_string(), run);
        self
    }

    /// Register a successful script returning `result`.
    pub fn succeeding(self, path: &str, result: &str) -> Self {
        let run = ScriptRun {
            result: result.to_string(),
            output: format!("running {path}\n"),
            exception_trace: None,
            elapsed_ms: 5,
        };
        self.with_outcome(path, run)
    }

    /// Register a script that throws with `trace`.
    pub fn failing(self, path: &str, trace: &str) -> Self {
        let run = ScriptRun {
            result: String::new(),
            output: format!("running {path}\n"),
            exception_trace: Some(trace.to_string()),
            elapsed_ms: 7,
        };
        self.with_outcome(path, run)
    }

    /// Paths run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptInterpreter for ScriptedInterpreter {
    async fn run(&self, _session: &dyn RepositorySession, path: &str) -> ScriptRun {
        self.calls.lock().unwrap().push(path.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| ScriptRun {
                exception_trace: Some(format!("MissingScriptException: no script at {path}")),
                ..ScriptRun::default()
            })
    }
}
