//! Shared fixtures: an in-process "native library" and a counting linker.

#![allow(dead_code)]

use snapload::native::{NativeStatus, STATUS_INVALID_INPUT, STATUS_OK};
use snapload::{
    LinkError, LinkedLibrary, Linker, LoadContext, LoadGuard, LoaderConfig, MemoryBundle,
    NativeApi, NATIVE_BRIDGE_KEY,
};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const RESOURCE: &str = "libsnappynative-linux-x86_64-64.so";

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// A bridge key no other test in this binary uses.
pub fn unique_key() -> String {
    format!("{}#{}", NATIVE_BRIDGE_KEY, NEXT_KEY.fetch_add(1, Ordering::Relaxed))
}

unsafe extern "C" fn codec(
    _input: *const c_char,
    _len: usize,
    _out: *mut c_char,
    _out_len: *mut usize,
) -> NativeStatus {
    STATUS_INVALID_INPUT
}

unsafe extern "C" fn max_compressed_length(n: usize) -> usize {
    32 + n + n / 6
}

unsafe extern "C" fn uncompressed_length(
    _input: *const c_char,
    _len: usize,
    _result: *mut usize,
) -> NativeStatus {
    STATUS_INVALID_INPUT
}

unsafe extern "C" fn validate(_input: *const c_char, len: usize) -> NativeStatus {
    if len > 0 {
        STATUS_OK
    } else {
        STATUS_INVALID_INPUT
    }
}

unsafe extern "C" fn current_version() -> *const c_char {
    c"1.1.10".as_ptr()
}

unsafe extern "C" fn stale_version() -> *const c_char {
    c"1.0.4".as_ptr()
}

pub fn api(stale: bool) -> NativeApi {
    NativeApi {
        compress: codec,
        uncompress: codec,
        max_compressed_length,
        uncompressed_length,
        validate_compressed_buffer: validate,
        library_version: if stale { stale_version } else { current_version },
    }
}

/// Stands in for the platform linker and counts physical link calls.
///
/// Bridges live in one process-wide registry, so each linker comes with
/// its own bridge key; guards built with [`guard`] share a bridge exactly
/// when they share a linker.
pub struct CountingLinker {
    pub key: String,
    pub calls: AtomicUsize,
    pub stale_version: bool,
    pub fail: bool,
    pub paths: parking_lot::Mutex<Vec<PathBuf>>,
}

impl Default for CountingLinker {
    fn default() -> Self {
        Self {
            key: unique_key(),
            calls: AtomicUsize::new(0),
            stale_version: false,
            fail: false,
            paths: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

impl CountingLinker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stale() -> Arc<Self> {
        Arc::new(Self {
            stale_version: true,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Linker for CountingLinker {
    fn link(&self, path: &Path) -> Result<LinkedLibrary, LinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().push(path.to_path_buf());
        // Widen the window in which concurrent callers could race.
        std::thread::sleep(std::time::Duration::from_millis(10));
        if self.fail {
            return Err(LinkError::NotFound {
                path: path.display().to_string(),
                reason: "wrong ELF class: ELFCLASS32".to_string(),
            });
        }
        Ok(LinkedLibrary::from_api(path, api(self.stale_version)))
    }
}

/// Bundle holding a fake binary for the linux/x86_64 resource name.
pub fn bundle() -> Arc<MemoryBundle> {
    Arc::new(MemoryBundle::new().with(RESOURCE, b"\x7fELF fake snappy".to_vec()))
}

/// Config pinned to linux/x86_64 that extracts into `tmp`.
pub fn config(tmp: &TempDir) -> LoaderConfig {
    LoaderConfig::default()
        .with_platform("Linux", "amd64")
        .with_tmp_dir(tmp.path())
        .with_keep_extracted(true)
}

pub fn guard(context: &Arc<LoadContext>, tmp: &TempDir, linker: &Arc<CountingLinker>) -> LoadGuard {
    guard_with(context, config(tmp), linker)
}

/// Like [`guard`] with a custom configuration.
pub fn guard_with(
    context: &Arc<LoadContext>,
    config: LoaderConfig,
    linker: &Arc<CountingLinker>,
) -> LoadGuard {
    LoadGuard::new(context.clone(), config)
        .with_bundle(bundle())
        .with_linker(linker.clone())
        .with_bridge_key(linker.key.clone())
}
