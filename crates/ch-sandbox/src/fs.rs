use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errno::Errno;
use crate::policy::{parse_open_mode, safe_read_path, safe_write_path};

/// Executes script file operations beneath a data root after the policy
/// has approved them. The active context name is passed in by the caller.
#[derive(Debug, Clone)]
pub struct SandboxedFs {
    root: PathBuf,
}

impl SandboxedFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.replace('\\', "/"))
    }

    pub fn open(&self, active: Option<&str>, path: &str, mode: &str) -> Result<File, Errno> {
        let mode = parse_open_mode(mode)?;
        if !safe_read_path(path) {
            debug!(path, "sandbox refused open outside the data root");
            return Err(Errno::Perm);
        }
        if mode.writes() && !safe_write_path(active, path) {
            debug!(path, context = active.unwrap_or(""), "sandbox refused write open");
            return Err(Errno::Perm);
        }

        let full = self.resolve(path);
        if mode.create {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(mode.read)
            .write(mode.write)
            .append(mode.append)
            .truncate(mode.truncate)
            .create(mode.create)
            .open(full)?;
        Ok(file)
    }

    pub fn remove(&self, active: Option<&str>, path: &str) -> Result<(), Errno> {
        if !safe_write_path(active, path) {
            debug!(path, context = active.unwrap_or(""), "sandbox refused remove");
            return Err(Errno::Perm);
        }
        let full = self.resolve(path);
        if full.is_dir() {
            fs::remove_dir(full)?;
        } else {
            fs::remove_file(full)?;
        }
        Ok(())
    }

    pub fn rename(&self, active: Option<&str>, from: &str, to: &str) -> Result<(), Errno> {
        if !safe_write_path(active, from) || !safe_write_path(active, to) {
            debug!(from, to, context = active.unwrap_or(""), "sandbox refused rename");
            return Err(Errno::Perm);
        }
        fs::rename(self.resolve(from), self.resolve(to))?;
        Ok(())
    }

    /// Process spawning is never available to scripts.
    pub fn popen(&self, _command: &str, _mode: &str) -> Result<File, Errno> {
        Err(Errno::Inval)
    }

    pub fn pclose(&self) -> Result<i32, Errno> {
        Err(Errno::Child)
    }

    pub fn system(&self, _command: &str) -> Result<i32, Errno> {
        Err(Errno::Perm)
    }
}
