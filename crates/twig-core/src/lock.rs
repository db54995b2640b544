//! The `.twig/twig.lock` advisory lock that serializes mutating commands.
//!
//! Backed by `fs2` (`flock(2)` on Unix, `LockFileEx` on Windows), so the
//! lock dies with the process that holds it.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{TwigError, TwigResult};

const LOCK_FILE: &str = "twig.lock";
const RETRY_EVERY: Duration = Duration::from_millis(10);

/// Held for as long as the value lives.
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Take the lock in `twig_dir`, retrying until `timeout` has passed.
    pub fn acquire(twig_dir: &Path, timeout: Duration) -> TwigResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(twig_dir.join(LOCK_FILE))?;

        let deadline = Instant::now() + timeout;
        while file.try_lock_exclusive().is_err() {
            if Instant::now() >= deadline {
                tracing::warn!(?timeout, "repository lock is held by another process");
                return Err(TwigError::LockTimeout);
            }
            thread::sleep(RETRY_EVERY);
        }
        Ok(RepoLock { _file: file })
    }
}
