//! The permission-enforcing wrapper around the filesystem facade.

use std::sync::Arc;

use nestfs::{DirEntry, Fs, NodeStat, WatchCallback, WatchHandle};

use crate::checker::PermissionChecker;
use crate::error::{Error, Result};
use crate::grant::AccessMode;

/// A per-caller view of the filesystem.
///
/// Every method checks the caller's grants *before* delegating, so the
/// underlying facade is never invoked for a denied call: no mutation
/// happens and no watch event fires. Reads require a `Read`-satisfying
/// grant, mutations a `Write`-satisfying one; `rename` needs write access
/// to both endpoints and `copy` needs read on the source plus write on the
/// destination.
#[derive(Clone)]
pub struct ScopedFs {
    fs: Fs,
    checker: Arc<PermissionChecker>,
    caller_id: String,
}

impl ScopedFs {
    pub fn new(fs: Fs, checker: Arc<PermissionChecker>, caller_id: impl Into<String>) -> Self {
        Self {
            fs,
            checker,
            caller_id: caller_id.into(),
        }
    }

    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    fn check(&self, path: &str, mode: AccessMode) -> Result<()> {
        if self.checker.can_access_path(&self.caller_id, path, mode) {
            Ok(())
        } else {
            diagnostics::log_debug!(
                "denied {mode} on {path} for {caller}",
                mode: mode.to_string(),
                path: path,
                caller: self.caller_id.as_str()
            );
            Err(Error::denied(path, mode))
        }
    }

    pub async fn mkdir(&self, path: &str) -> Result<NodeStat> {
        self.check(path, AccessMode::Write)?;
        Ok(self.fs.mkdir(path).await?)
    }

    pub async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.check(path, AccessMode::Read)?;
        Ok(self.fs.readdir(path).await?)
    }

    pub async fn rmdir(&self, path: &str) -> Result<()> {
        self.check(path, AccessMode::Write)?;
        Ok(self.fs.rmdir(path).await?)
    }

    pub async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.check(path, AccessMode::Read)?;
        Ok(self.fs.read_file(path).await?)
    }

    pub async fn read_text_file(&self, path: &str) -> Result<String> {
        self.check(path, AccessMode::Read)?;
        Ok(self.fs.read_text_file(path).await?)
    }

    pub async fn write_file(&self, path: &str, data: &[u8]) -> Result<NodeStat> {
        self.check(path, AccessMode::Write)?;
        Ok(self.fs.write_file(path, data).await?)
    }

    pub async fn write_text_file(&self, path: &str, text: &str) -> Result<NodeStat> {
        self.check(path, AccessMode::Write)?;
        Ok(self.fs.write_text_file(path, text).await?)
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.check(path, AccessMode::Write)?;
        Ok(self.fs.delete_file(path).await?)
    }

    pub async fn stat(&self, path: &str) -> Result<NodeStat> {
        self.check(path, AccessMode::Read)?;
        Ok(self.fs.stat(path).await?)
    }

    /// Never errors. Paths outside the caller's readable scope report
    /// `false`, hiding their existence.
    pub async fn exists(&self, path: &str) -> bool {
        if self.check(path, AccessMode::Read).is_err() {
            return false;
        }
        self.fs.exists(path).await
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<NodeStat> {
        self.check(old_path, AccessMode::Write)?;
        self.check(new_path, AccessMode::Write)?;
        Ok(self.fs.rename(old_path, new_path).await?)
    }

    pub async fn copy(&self, src: &str, dest: &str) -> Result<NodeStat> {
        self.check(src, AccessMode::Read)?;
        self.check(dest, AccessMode::Write)?;
        Ok(self.fs.copy(src, dest).await?)
    }

    pub fn watch(&self, prefix: &str, callback: WatchCallback) -> Result<WatchHandle> {
        self.check(prefix, AccessMode::Read)?;
        Ok(self.fs.watch(prefix, callback)?)
    }

    pub fn can_use_service(&self, service: &str) -> bool {
        self.checker.can_use_service(&self.caller_id, service)
    }

    pub fn require_service(&self, service: &str) -> Result<()> {
        if self.can_use_service(service) {
            Ok(())
        } else {
            Err(Error::service_denied(service))
        }
    }
}
