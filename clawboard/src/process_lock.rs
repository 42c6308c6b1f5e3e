//! Process-level lock serializing clawboard runs.
//!
//! Two runs writing the same output directory would interleave artifact
//! replacements, so a run holds an advisory flock scoped to its output
//! directory for its whole lifetime. A second run against the same
//! directory fails fast; runs against different directories do not contend.

use anyhow::{Context, Result};
use clawboard_core::Config;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

const RUN_LOCK_FILE: &str = "clawboard-run.lock";

/// Guard held for the duration of a run. Closing the file releases the lock.
pub struct RunGuard {
    _file: File,
}

/// Acquire the run lock for `output_dir`.
pub fn acquire_run_guard(output_dir: &Path) -> Result<RunGuard> {
    let dir = Config::runtime_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create runtime lock directory: {}", dir.display()))?;

    let path = dir.join(lock_filename(output_dir));
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;

    match try_lock_exclusive(&file) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Acquired run lock");
            Ok(RunGuard { _file: file })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => anyhow::bail!(
            "another clawboard run is already writing {}",
            output_dir.display()
        ),
        Err(e) => Err(e).with_context(|| format!("failed to lock file: {}", path.display())),
    }
}

fn lock_filename(output_dir: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    output_dir.to_string_lossy().hash(&mut hasher);
    format!("{RUN_LOCK_FILE}.{:016x}", hasher.finish())
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    const LOCK_EX: i32 = 2;
    const LOCK_NB: i32 = 4;
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    if unsafe { flock(file.as_raw_fd(), LOCK_EX | LOCK_NB) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

#[cfg(not(unix))]
compile_error!("clawboard run locks currently require Unix (macOS/Linux)");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_filename_is_scoped_to_output_dir() {
        let a = lock_filename(Path::new("/srv/a/api"));
        let b = lock_filename(Path::new("/srv/b/api"));
        assert_ne!(a, b);
        assert!(a.starts_with("clawboard-run.lock."));
        assert_eq!(a, lock_filename(Path::new("/srv/a/api")));
    }

    #[test]
    fn test_second_guard_on_same_dir_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("api");

        let guard = acquire_run_guard(&output).unwrap();
        let err = acquire_run_guard(&output).err().unwrap();
        assert!(err.to_string().contains("already writing"));

        drop(guard);
        assert!(acquire_run_guard(&output).is_ok());
    }

    #[test]
    fn test_different_dirs_do_not_contend() {
        let dir = tempfile::TempDir::new().unwrap();
        let _a = acquire_run_guard(&dir.path().join("a")).unwrap();
        assert!(acquire_run_guard(&dir.path().join("b")).is_ok());
    }
}
