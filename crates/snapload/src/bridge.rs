//! The one-and-only link point
//!
//! A `Bridge` owns a single "linked" cell and the single call into the
//! platform linker. It is installed once into the process-wide registry
//! behind [`LoadContext`](crate::context::LoadContext), and every context
//! links through the same instance, so the physical link happens at most
//! once no matter how many contexts bootstrap.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::cleanup;
use crate::error::LinkError;
use crate::native::{LinkedLibrary, Linker};
use crate::platform::PlatformId;

/// Registry key of the native library bridge
pub const NATIVE_BRIDGE_KEY: &str = "snapload::native-bridge";

pub type LinkOutcome = Result<Arc<LinkedLibrary>, LinkError>;

pub struct Bridge {
    key: String,
    linker: Arc<dyn Linker>,
    platform: OnceLock<PlatformId>,
    linked: OnceLock<LinkOutcome>,
    link_calls: AtomicUsize,
}

impl Bridge {
    pub fn new(key: impl Into<String>, linker: Arc<dyn Linker>) -> Self {
        Self {
            key: key.into(),
            linker,
            platform: OnceLock::new(),
            linked: OnceLock::new(),
            link_calls: AtomicUsize::new(0),
        }
    }

    /// Link the library built for `platform` at `path`, or return the
    /// outcome of the link that already happened.
    ///
    /// The first caller performs the link while concurrent callers block;
    /// the outcome becomes visible only once the link has returned. Later
    /// calls never link again, whatever `path` they pass, and a failed link
    /// is returned to every later caller. A linked file is pinned so that
    /// [`cleanup::run`] leaves it in place.
    pub fn load(&self, platform: &PlatformId, path: &Path) -> LinkOutcome {
        let outcome = self.linked.get_or_init(|| {
            self.link_calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.platform.set(*platform);
            tracing::info!(
                bridge = %self.key,
                platform = %platform,
                path = %path.display(),
                "linking native library"
            );
            match self.linker.link(path) {
                Ok(library) => {
                    cleanup::pin(path);
                    Ok(Arc::new(library))
                }
                Err(e) => {
                    tracing::error!(bridge = %self.key, error = %e, "native library link failed");
                    Err(e)
                }
            }
        });

        if let Ok(library) = outcome {
            if library.path() != path {
                tracing::debug!(
                    requested = %path.display(),
                    linked = %library.path().display(),
                    "native library already linked from another path"
                );
            }
        }
        outcome.clone()
    }

    /// Outcome of the link, if one has completed.
    pub fn outcome(&self) -> Option<LinkOutcome> {
        self.linked.get().cloned()
    }

    /// Platform of the binary handed to the linker, once a link has run.
    pub fn platform(&self) -> Option<PlatformId> {
        self.platform.get().copied()
    }

    pub fn is_linked(&self) -> bool {
        matches!(self.linked.get(), Some(Ok(_)))
    }

    /// Number of physical link calls made through this bridge.
    pub fn link_calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("key", &self.key)
            .field("linked", &self.linked.get().map(|o| o.is_ok()))
            .field("link_calls", &self.link_calls())
            .finish()
    }
}
