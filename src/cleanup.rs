//! Delete-on-exit registry
//!
//! Paths registered here are removed when the process terminates normally
//! (return from `main` or `std::process::exit`). Closing or dropping an
//! engine never removes anything, so an instance reopened later in the same
//! process still sees its data.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Paths to remove at process exit, in registration order
static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Guards the one-time `atexit` registration
static HOOK: Once = Once::new();

/// Mark `path` for removal when the process exits
///
/// Registering the same path twice is a no-op.
pub fn delete_on_exit(path: &Path) {
    HOOK.call_once(|| {
        // SAFETY: the callback is a plain `extern "C"` function that never
        // unwinds.
        let rc = unsafe { libc::atexit(remove_pending) };
        if rc != 0 {
            warn!(rc, "atexit registration failed; files will not be removed");
        }
    });

    let mut pending = PENDING.lock();
    if !pending.iter().any(|p| p == path) {
        debug!(path = %path.display(), "registered for removal at exit");
        pending.push(path.to_path_buf());
    }
}

/// Paths currently registered for removal at exit
pub fn pending_deletions() -> Vec<PathBuf> {
    PENDING.lock().clone()
}

/// Whether `path` is registered for removal at exit
pub fn is_pending(path: &Path) -> bool {
    PENDING.lock().iter().any(|p| p == path)
}

// No logging here: the subscriber may already be torn down at exit.
extern "C" fn remove_pending() {
    let paths = std::mem::take(&mut *PENDING.lock());
    for path in paths {
        let _ = fs::remove_file(&path);
    }
}
