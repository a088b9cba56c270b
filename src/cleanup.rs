use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// RAII guard that removes a freshly created directory unless the
/// operation that created it is marked successful.
///
/// Used by installs so that a failed extraction or an unreadable manifest
/// never leaves a half-populated version directory in the store.
pub struct RollbackGuard<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    path: PathBuf,
    armed: bool,
}

impl<'a, R: Runtime + ?Sized> RollbackGuard<'a, R> {
    /// Register `path` for removal on drop.
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark the operation as successful, keeping the path.
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl<R: Runtime + ?Sized> Drop for RollbackGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed || !self.runtime.exists(&self.path) {
            return;
        }
        debug!("Rolling back: {:?}", self.path);
        let result = if self.runtime.is_dir(&self.path) {
            self.runtime.remove_dir_all(&self.path)
        } else {
            self.runtime.remove_file(&self.path)
        };
        if let Err(e) = result {
            warn!("Failed to roll back {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_guard_removes_directory_when_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.0.0");
        std::fs::create_dir_all(path.join("nested")).unwrap();
        std::fs::write(path.join("nested/file.txt"), "partial").unwrap();

        {
            let _guard = RollbackGuard::new(&RealRuntime, path.clone());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_guard_keeps_directory_after_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.0.0");
        std::fs::create_dir_all(&path).unwrap();

        let guard = RollbackGuard::new(&RealRuntime, path.clone());
        assert_eq!(guard.path(), path.as_path());
        guard.commit();

        assert!(path.exists());
    }

    #[test]
    fn test_guard_tolerates_failed_removal() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/store/Mod/1.0.0");

        runtime.expect_exists().with(eq(path.clone())).returning(|_| true);
        runtime.expect_is_dir().with(eq(path.clone())).returning(|_| true);
        runtime
            .expect_remove_dir_all()
            .with(eq(path.clone()))
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        drop(RollbackGuard::new(&runtime, path));
    }
}
