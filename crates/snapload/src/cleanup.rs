//! Best-effort removal of extracted binaries at process exit.
//!
//! Removal may fail while the dynamic linker still holds the file (Windows
//! locks mapped DLLs); such failures are ignored. Files that have been
//! linked are pinned: only the exit hook removes them.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Once;

static PENDING: Lazy<Mutex<Vec<PathBuf>>> = Lazy::new(|| Mutex::new(Vec::new()));
static PINNED: Lazy<Mutex<Vec<PathBuf>>> = Lazy::new(|| Mutex::new(Vec::new()));
static HOOK: Once = Once::new();

/// Schedule `path` for removal when the process exits.
pub fn register(path: &Path) {
    {
        let mut pending = PENDING.lock();
        if pending.iter().any(|p| p == path) {
            return;
        }
        pending.push(path.to_path_buf());
    }
    HOOK.call_once(install_exit_hook);
}

/// Paths currently scheduled for removal.
pub fn pending() -> Vec<PathBuf> {
    PENDING.lock().clone()
}

/// Mark `path` as mapped into the process. [`run`] will not remove it.
pub fn pin(path: &Path) {
    let mut pinned = PINNED.lock();
    if !pinned.iter().any(|p| p == path) {
        pinned.push(path.to_path_buf());
    }
}

pub fn is_pinned(path: &Path) -> bool {
    PINNED.lock().iter().any(|p| p == path)
}

/// Remove every scheduled file that is not linked. Returns how many were
/// removed; pinned files stay scheduled for the exit hook.
pub fn run() -> usize {
    let paths = {
        let pinned = PINNED.lock();
        let mut pending = PENDING.lock();
        let (keep, remove): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|p| pinned.contains(p));
        *pending = keep;
        remove
    };

    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "could not remove extracted library");
            }
        }
    }
    removed
}

#[cfg(unix)]
fn install_exit_hook() {
    extern "C" fn on_exit() {
        // Never block or unwind inside an exit handler.
        if let Some(mut pending) = PENDING.try_lock() {
            for path in pending.drain(..) {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    let rc = unsafe { libc::atexit(on_exit) };
    if rc != 0 {
        tracing::warn!("failed to register exit cleanup for extracted libraries");
    }
}

#[cfg(not(unix))]
fn install_exit_hook() {
    // No portable exit hook; files stay behind and are reused by fingerprint.
}
