//! Bundled native binaries
//!
//! Per-platform binaries placed in `native/` are embedded at build time;
//! `build.rs` generates the index included below.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// An embedded per-platform binary
pub struct BundledBinary {
    /// Resource name (e.g., "libsnappynative-linux-x86_64-64.so")
    pub name: &'static str,
    /// Raw library bytes
    pub bytes: &'static [u8],
}

// Include the generated index
include!(concat!(env!("OUT_DIR"), "/native_index.rs"));

/// Source of bundled binaries, looked up by resource name
pub trait ResourceBundle: Send + Sync {
    /// Bytes of the named resource, if bundled.
    fn find(&self, name: &str) -> Option<Cow<'_, [u8]>>;

    /// Names of every bundled resource.
    fn names(&self) -> Vec<String>;
}

/// Binaries compiled into this crate
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedBundle;

impl ResourceBundle for EmbeddedBundle {
    fn find(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        BUNDLED
            .iter()
            .find(|b| b.name == name)
            .map(|b| Cow::Borrowed(b.bytes))
    }

    fn names(&self) -> Vec<String> {
        BUNDLED.iter().map(|b| b.name.to_string()).collect()
    }
}

/// Binaries held in memory, supplied by the embedder
#[derive(Debug, Default, Clone)]
pub struct MemoryBundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl ResourceBundle for MemoryBundle {
    fn find(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.entries.get(name).map(|b| Cow::Borrowed(b.as_slice()))
    }

    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
