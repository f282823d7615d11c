//! Isolated loading contexts
//!
//! A `LoadContext` is a node in a tree of isolation scopes. Each context has
//! its own local state (and typically its own [`LoadGuard`]). Shared units
//! such as the native [`Bridge`] are not owned by any tree: they live in one
//! process-wide registry keyed by a stable identifier, so every context of
//! every tree, including independently created roots, resolves the same
//! instance.
//!
//! [`LoadGuard`]: crate::guard::LoadGuard

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::bridge::Bridge;

/// Root context of the process
static PROCESS_ROOT: Lazy<Arc<LoadContext>> = Lazy::new(|| LoadContext::root("process"));

/// Bridges shared by every context in the process
static BRIDGES: Lazy<Mutex<HashMap<String, Arc<Bridge>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub struct LoadContext {
    name: String,
    parent: Option<Arc<LoadContext>>,
}

impl LoadContext {
    /// Create a new root context.
    ///
    /// Roots only group contexts for naming; they still share the process
    /// bridge registry.
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: None,
        })
    }

    /// The root context shared by the whole process.
    pub fn process() -> Arc<Self> {
        PROCESS_ROOT.clone()
    }

    /// Create an isolated context below `self`.
    pub fn child(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: Some(self.clone()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<LoadContext>> {
        self.parent.as_ref()
    }

    /// Slash-separated names from the root down to `self`.
    pub fn path(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}/{}", parent.path(), self.name),
            None => self.name.clone(),
        }
    }

    /// Find the bridge registered under `key`.
    pub fn lookup_bridge(&self, key: &str) -> Option<Arc<Bridge>> {
        BRIDGES.lock().get(key).cloned()
    }

    /// Resolve the bridge registered under `key`, installing one built by
    /// `make` if none exists yet.
    ///
    /// `make` runs at most once per key in the process, whichever context
    /// asks first.
    pub fn install_bridge<F>(&self, key: &str, make: F) -> Arc<Bridge>
    where
        F: FnOnce() -> Bridge,
    {
        BRIDGES
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(context = %self.path(), key, "installing bridge");
                Arc::new(make())
            })
            .clone()
    }
}

impl fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("path", &self.path())
            .finish()
    }
}
