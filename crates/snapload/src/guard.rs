//! Bootstrap guard
//!
//! A `LoadGuard` is one bootstrap attempt: it walks the state machine
//! `NotAttempted → Loading → Loaded | Failed` exactly once and then hands
//! the cached outcome to every caller. Its own state is local to the guard;
//! the process-wide exactly-once link is enforced by the [`Bridge`] it
//! reaches through its [`LoadContext`].
//!
//! A guard never leaves `Failed`. Retrying after a transient failure (see
//! [`LoadError::is_retryable`]) means building a new guard.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::bridge::{Bridge, NATIVE_BRIDGE_KEY};
use crate::bundle::{EmbeddedBundle, ResourceBundle};
use crate::config::LoaderConfig;
use crate::context::LoadContext;
use crate::error::LoadError;
use crate::locator::{ExtractedLibraryFile, Locator};
use crate::native::{DynamicLinker, LinkedLibrary, Linker, NativeApi};
use crate::platform::PlatformId;
use crate::version::{check_version, VersionReport};

const NOT_ATTEMPTED: u8 = 0;
const LOADING: u8 = 1;
const LOADED: u8 = 2;
const FAILED: u8 = 3;

/// Lifecycle of a bootstrap attempt
#[derive(Debug, Clone)]
pub enum LoadState {
    NotAttempted,
    Loading,
    Loaded,
    Failed(LoadError),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

/// Everything known about a successfully loaded library
#[derive(Debug, Clone)]
pub struct LoadedNative {
    pub platform: PlatformId,
    pub library: Arc<LinkedLibrary>,
    /// Binary located by this guard; `None` when another context had
    /// already linked the library.
    pub file: Option<ExtractedLibraryFile>,
    pub version: VersionReport,
}

impl LoadedNative {
    pub fn api(&self) -> &NativeApi {
        self.library.api()
    }
}

pub struct LoadGuard {
    context: Arc<LoadContext>,
    config: LoaderConfig,
    bundle: Arc<dyn ResourceBundle>,
    linker: Arc<dyn Linker>,
    bridge_key: String,
    state: AtomicU8,
    outcome: OnceLock<Result<LoadedNative, LoadError>>,
    lock: Mutex<()>,
    published: Condvar,
}

impl LoadGuard {
    /// A guard using the embedded binaries and the platform linker.
    pub fn new(context: Arc<LoadContext>, config: LoaderConfig) -> Self {
        Self {
            context,
            config,
            bundle: Arc::new(EmbeddedBundle),
            linker: Arc::new(DynamicLinker),
            bridge_key: NATIVE_BRIDGE_KEY.to_string(),
            state: AtomicU8::new(NOT_ATTEMPTED),
            outcome: OnceLock::new(),
            lock: Mutex::new(()),
            published: Condvar::new(),
        }
    }

    pub fn with_bundle(mut self, bundle: Arc<dyn ResourceBundle>) -> Self {
        self.bundle = bundle;
        self
    }

    /// Linker used if this guard is the one that installs the bridge.
    pub fn with_linker(mut self, linker: Arc<dyn Linker>) -> Self {
        self.linker = linker;
        self
    }

    /// Link through the bridge registered under `key` instead of
    /// [`NATIVE_BRIDGE_KEY`]. Guards sharing a key share one link.
    pub fn with_bridge_key(mut self, key: impl Into<String>) -> Self {
        self.bridge_key = key.into();
        self
    }

    pub fn bridge_key(&self) -> &str {
        &self.bridge_key
    }

    pub fn context(&self) -> &Arc<LoadContext> {
        &self.context
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        match self.state.load(Ordering::Acquire) {
            NOT_ATTEMPTED => LoadState::NotAttempted,
            LOADING => LoadState::Loading,
            _ => match self.outcome.get() {
                Some(Ok(_)) => LoadState::Loaded,
                Some(Err(e)) => LoadState::Failed(e.clone()),
                None => LoadState::Failed(LoadError::Interrupted),
            },
        }
    }

    /// Load the native library unless this guard already has.
    ///
    /// Safe to call from any number of threads. Exactly one caller runs the
    /// bootstrap; the rest wait for it. A failure is returned again on every
    /// later call; it is never retried by this guard.
    pub fn ensure_loaded(&self) -> Result<(), LoadError> {
        self.loaded().map(|_| ())
    }

    /// Like [`ensure_loaded`](Self::ensure_loaded), returning the load details.
    pub fn loaded(&self) -> Result<&LoadedNative, LoadError> {
        loop {
            match self.state.load(Ordering::Acquire) {
                LOADED | FAILED => return self.published_outcome(),
                NOT_ATTEMPTED => {
                    if self
                        .state
                        .compare_exchange(NOT_ATTEMPTED, LOADING, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.run_bootstrap();
                        return self.published_outcome();
                    }
                }
                _ => {}
            }

            let mut lock = self.lock.lock();
            while self.state.load(Ordering::Acquire) == LOADING {
                self.published.wait(&mut lock);
            }
        }
    }

    /// Entry points of the loaded library, loading it first if needed.
    pub fn api(&self) -> Result<&NativeApi, LoadError> {
        self.loaded().map(LoadedNative::api)
    }

    fn published_outcome(&self) -> Result<&LoadedNative, LoadError> {
        match self.outcome.get() {
            Some(Ok(loaded)) => Ok(loaded),
            Some(Err(e)) => Err(e.clone()),
            None => Err(LoadError::Interrupted),
        }
    }

    fn run_bootstrap(&self) {
        // Releases waiters if the bootstrap unwinds.
        struct PublishOnUnwind<'a>(&'a LoadGuard);

        impl Drop for PublishOnUnwind<'_> {
            fn drop(&mut self) {
                let _ = self.0.outcome.set(Err(LoadError::Interrupted));
                self.0.publish(FAILED);
            }
        }

        let unwind = PublishOnUnwind(self);
        let result = self.bootstrap();
        std::mem::forget(unwind);

        let state = match &result {
            Ok(loaded) => {
                tracing::debug!(
                    context = %self.context.path(),
                    path = %loaded.library.path().display(),
                    "native library ready"
                );
                LOADED
            }
            Err(e) => {
                tracing::warn!(context = %self.context.path(), error = %e, "native library bootstrap failed");
                FAILED
            }
        };
        let _ = self.outcome.set(result);
        self.publish(state);
    }

    fn publish(&self, state: u8) {
        let _lock = self.lock.lock();
        self.state.store(state, Ordering::Release);
        self.published.notify_all();
    }

    fn bootstrap(&self) -> Result<LoadedNative, LoadError> {
        let bridge = self.context.install_bridge(&self.bridge_key, || {
            Bridge::new(self.bridge_key.as_str(), self.linker.clone())
        });

        // A library linked by another context is adopted as is, whatever
        // platform this guard's own configuration would resolve to.
        let (platform, library, file) = match (bridge.outcome(), bridge.platform()) {
            (Some(outcome), Some(platform)) => {
                tracing::debug!(context = %self.context.path(), "native library already linked");
                (platform, outcome?, None)
            }
            _ => {
                let platform = PlatformId::resolve(&self.config)?;
                let file = Locator::new(&self.config, self.bundle.as_ref()).locate(&platform)?;
                let library = bridge.load(&platform, &file.path)?;
                (platform, library, Some(file))
            }
        };

        let version = check_version(&library, self.config.expected_version());
        Ok(LoadedNative {
            platform,
            library,
            file,
            version,
        })
    }
}

impl fmt::Debug for LoadGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadGuard")
            .field("context", &self.context.path())
            .field("state", &self.state())
            .finish()
    }
}
