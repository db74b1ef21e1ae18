//! Advisory run lock on the shared bind directory.
//!
//! The bind mount is the data bus between steps, so at most one plan may
//! execute against it at a time. The lock is a file holding the owner's
//! pid; a lock whose pid no longer exists is stale and is reclaimed.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Lock file name inside the bind directory.
pub const LOCK_FILE: &str = ".onhm.lock";

/// Held advisory lock. Released (file removed) on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock inside `bind_dir`.
    ///
    /// # Errors
    ///
    /// Fails when the bind directory does not exist, or when another live
    /// process holds the lock.
    pub fn acquire(bind_dir: &std::path::Path) -> Result<Self> {
        if !bind_dir.is_dir() {
            bail!("bind directory {} does not exist", bind_dir.display());
        }
        let path = bind_dir.join(LOCK_FILE);

        if let Ok(existing) = std::fs::read_to_string(&path) {
            let holder = existing.trim().parse::<u32>().ok();
            match holder {
                Some(pid) if process_alive(pid) => {
                    bail!(
                        "another run (pid {pid}) holds the lock {}; \
                         concurrent runs against one bind path are not supported",
                        path.display()
                    );
                }
                _ => {
                    // Stale lock from a dead process; reclaim it.
                    std::fs::remove_file(&path)
                        .with_context(|| format!("removing stale lock {}", path.display()))?;
                }
            }
        }

        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("creating lock file {}", path.display()))?;
        write!(file, "{}", std::process::id())
            .with_context(|| format!("writing lock file {}", path.display()))?;
        Ok(Self { path })
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Best-effort liveness probe for a pid.
fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new(&format!("/proc/{pid}")).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        // Without a portable probe, assume the holder is alive; an admin
        // can remove the lock file manually.
        let _ = pid;
        true
    }
}
