//! Snapload
//!
//! Exactly-once bootstrap of the snappy native library.
//!
//! The first call to [`ensure_loaded`] detects the platform, locates (or
//! extracts) the matching binary and links it into the process; every later
//! call, from any thread or [`LoadContext`], observes the cached outcome.
//!
//! # Usage
//!
//! ```rust,ignore
//! snapload::ensure_loaded()?;
//! let api = snapload::native()?;
//! let bound = api.max_compressed_length(4096);
//! ```
//!
//! Embedders that run several isolated contexts create one [`LoadGuard`]
//! per context; all of them link through the one process-wide bridge, which
//! is also the bridge behind [`ensure_loaded`].

pub mod bridge;
pub mod bundle;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod locator;
pub mod native;
pub mod platform;
pub mod version;

use once_cell::sync::Lazy;

pub use bridge::{Bridge, NATIVE_BRIDGE_KEY};
pub use bundle::{BundledBinary, EmbeddedBundle, MemoryBundle, ResourceBundle};
pub use config::LoaderConfig;
pub use context::LoadContext;
pub use error::{ErrorKind, LinkError, LoadError};
pub use guard::{LoadGuard, LoadState, LoadedNative};
pub use locator::{ExtractedLibraryFile, Locator, NativeBinaryResource, SourceLocation};
pub use native::{DynamicLinker, LinkedLibrary, Linker, NativeApi};
pub use platform::{ArchFamily, Bitness, OsFamily, PlatformId};
pub use version::{VersionReport, VersionToken, EXPECTED_NATIVE_VERSION};

/// Guard behind the process-wide entry points
static DEFAULT_GUARD: Lazy<LoadGuard> =
    Lazy::new(|| LoadGuard::new(LoadContext::process(), LoaderConfig::from_env()));

/// The guard used by [`ensure_loaded`], bound to the process root context
/// and configured from the environment.
pub fn default_guard() -> &'static LoadGuard {
    &DEFAULT_GUARD
}

/// Load the native library into this process if it is not loaded yet.
///
/// The outcome is settled by the first call and returned unchanged for the
/// rest of the process, including failures that
/// [`LoadError::is_retryable`] reports as transient. To retry, build a new
/// [`LoadGuard`] on [`LoadContext::process`]; it links through the same
/// bridge, so the library is still linked at most once.
pub fn ensure_loaded() -> Result<(), LoadError> {
    DEFAULT_GUARD.ensure_loaded()
}

/// Entry points of the loaded native library.
pub fn native() -> Result<&'static NativeApi, LoadError> {
    DEFAULT_GUARD.api()
}

/// Version string reported by the loaded native library.
pub fn native_library_version() -> Result<Option<VersionToken>, LoadError> {
    DEFAULT_GUARD.loaded().map(|loaded| loaded.version.found.clone())
}
