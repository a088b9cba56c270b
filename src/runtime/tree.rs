//! Recursive file tree helpers.
//!
//! These walk a directory through [`Runtime`] and keep going after a
//! per-file failure; every failure is recorded in the returned
//! [`TreeReport`] so the caller can report them in aggregate.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use super::Runtime;
use crate::error::{FileConflict, ModError};

/// What to do when a destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingPolicy {
    Skip,
    Overwrite,
}

/// Outcome of a best-effort tree operation.
#[derive(Debug, Default)]
pub struct TreeReport {
    /// Files written (copy) or deleted (scrub).
    pub touched: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub conflicts: Vec<FileConflict>,
}

impl TreeReport {
    fn conflict(&mut self, path: &Path, err: impl std::fmt::Display) {
        self.conflicts.push(FileConflict {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }

    pub fn merge(&mut self, other: TreeReport) {
        self.touched.extend(other.touched);
        self.skipped.extend(other.skipped);
        self.conflicts.extend(other.conflicts);
    }
}

/// Recursively copy `from` into `to`, creating directories as needed.
///
/// `from` may be a single file, in which case `to` is the destination file.
#[tracing::instrument(skip(runtime))]
pub fn copy_tree<R: Runtime + ?Sized>(
    runtime: &R,
    from: &Path,
    to: &Path,
    policy: ExistingPolicy,
) -> TreeReport {
    let mut report = TreeReport::default();
    copy_into(runtime, from, to, policy, &mut report);
    report
}

fn copy_into<R: Runtime + ?Sized>(
    runtime: &R,
    from: &Path,
    to: &Path,
    policy: ExistingPolicy,
    report: &mut TreeReport,
) {
    if !runtime.is_dir(from) {
        if runtime.exists(to) && policy == ExistingPolicy::Skip {
            debug!("Keeping existing {:?}", to);
            report.skipped.push(to.to_path_buf());
            return;
        }
        if let Some(parent) = to.parent()
            && let Err(e) = runtime.create_dir_all(parent)
        {
            report.conflict(parent, e);
            return;
        }
        match runtime.copy(from, to) {
            Ok(_) => report.touched.push(to.to_path_buf()),
            Err(e) => report.conflict(to, format!("{:#}", e)),
        }
        return;
    }

    if let Err(e) = runtime.create_dir_all(to) {
        report.conflict(to, e);
        return;
    }

    let children = match runtime.read_dir(from) {
        Ok(children) => children,
        Err(e) => {
            report.conflict(from, e);
            return;
        }
    };

    for child in children {
        let Some(name) = child.file_name() else {
            continue;
        };
        copy_into(runtime, &child, &to.join(name), policy, report);
    }
}

/// Move a file or directory, replacing whatever is at `to`.
///
/// Tries a rename first and falls back to copy + delete (e.g. across
/// devices). A partially failed fallback copy is reported as
/// [`ModError::FilesystemConflict`].
#[tracing::instrument(skip(runtime))]
pub fn move_path<R: Runtime + ?Sized>(runtime: &R, from: &Path, to: &Path) -> Result<()> {
    if runtime.exists(to) {
        if runtime.is_dir(to) {
            runtime.remove_dir_all(to)?;
        } else {
            runtime.remove_file(to)?;
        }
    }
    if let Some(parent) = to.parent() {
        runtime.create_dir_all(parent)?;
    }

    if runtime.rename(from, to).is_ok() {
        return Ok(());
    }

    debug!("Rename {:?} -> {:?} failed, copying instead", from, to);
    let report = copy_tree(runtime, from, to, ExistingPolicy::Overwrite);
    if !report.conflicts.is_empty() {
        return Err(ModError::FilesystemConflict {
            conflicts: report.conflicts,
        }
        .into());
    }

    let removed = if runtime.is_dir(from) {
        runtime.remove_dir_all(from)
    } else {
        runtime.remove_file(from)
    };
    removed.with_context(|| format!("Failed to remove {:?} after copying it", from))
}

/// Delete every file below `root` whose file name is one of `names`.
#[tracing::instrument(skip(runtime, names))]
pub fn remove_matching_files<R: Runtime + ?Sized>(
    runtime: &R,
    root: &Path,
    names: &[String],
) -> TreeReport {
    let mut report = TreeReport::default();
    scrub(runtime, root, names, &mut report);
    report
}

fn scrub<R: Runtime + ?Sized>(
    runtime: &R,
    dir: &Path,
    names: &[String],
    report: &mut TreeReport,
) {
    let children = match runtime.read_dir(dir) {
        Ok(children) => children,
        Err(e) => {
            report.conflict(dir, e);
            return;
        }
    };

    for child in children {
        if runtime.is_dir(&child) {
            scrub(runtime, &child, names, report);
            continue;
        }
        let matches = child
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| names.iter().any(|name| name == n));
        if !matches {
            continue;
        }
        match runtime.remove_file(&child) {
            Ok(()) => report.touched.push(child),
            Err(e) => report.conflict(&child, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_copy_tree_skips_existing_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "new a").unwrap();
        fs::write(src.join("nested/b.txt"), "new b").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("a.txt"), "old a").unwrap();

        let report = copy_tree(&RealRuntime, &src, &dst, ExistingPolicy::Skip);

        assert!(report.conflicts.is_empty());
        assert_eq!(report.skipped, vec![dst.join("a.txt")]);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "old a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "new b");
    }

    #[test]
    fn test_copy_tree_overwrite() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.txt"), "new").unwrap();
        fs::write(dst.join("a.txt"), "old").unwrap();

        let report = copy_tree(&RealRuntime, &src, &dst, ExistingPolicy::Overwrite);

        assert_eq!(report.touched.len(), 1);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn test_copy_tree_collects_failures_and_continues() {
        let mut runtime = MockRuntime::new();
        let src = PathBuf::from("/src");
        let dst = PathBuf::from("/dst");

        runtime.expect_is_dir().with(eq(src.clone())).returning(|_| true);
        runtime
            .expect_is_dir()
            .returning(|_| false);
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_read_dir()
            .with(eq(src.clone()))
            .returning(|_| Ok(vec![PathBuf::from("/src/locked.dll"), PathBuf::from("/src/ok.dll")]));
        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_copy()
            .with(eq(PathBuf::from("/src/locked.dll")), eq(PathBuf::from("/dst/locked.dll")))
            .returning(|_, _| Err(anyhow::anyhow!("file is locked")));
        runtime
            .expect_copy()
            .with(eq(PathBuf::from("/src/ok.dll")), eq(PathBuf::from("/dst/ok.dll")))
            .returning(|_, _| Ok(3));

        let report = copy_tree(&runtime, &src, &dst, ExistingPolicy::Skip);

        assert_eq!(report.touched, vec![PathBuf::from("/dst/ok.dll")]);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].path, PathBuf::from("/dst/locked.dll"));
        assert!(report.conflicts[0].reason.contains("locked"));
    }

    #[test]
    fn test_move_path_replaces_destination() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("deep/to");
        fs::create_dir_all(from.join("core")).unwrap();
        fs::write(from.join("core/loader.dll"), "v2").unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("stale.txt"), "stale").unwrap();

        move_path(&RealRuntime, &from, &to).unwrap();

        assert!(!from.exists());
        assert!(!to.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(to.join("core/loader.dll")).unwrap(), "v2");
    }

    #[test]
    fn test_move_path_falls_back_to_copy() {
        let mut runtime = MockRuntime::new();
        let from = PathBuf::from("/a/file.ini");
        let to = PathBuf::from("/b/file.ini");

        runtime.expect_exists().returning(|_| false);
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("cross-device link")));
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_copy()
            .with(eq(from.clone()), eq(to.clone()))
            .times(1)
            .returning(|_, _| Ok(10));
        runtime
            .expect_remove_file()
            .with(eq(from.clone()))
            .times(1)
            .returning(|_| Ok(()));

        move_path(&runtime, &from, &to).unwrap();
    }

    #[test]
    fn test_remove_matching_files_recurses() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("plugins/Mod")).unwrap();
        fs::write(root.join("manifest.json"), "{}").unwrap();
        fs::write(root.join("plugins/Mod/manifest.json"), "{}").unwrap();
        fs::write(root.join("plugins/Mod/icon.png"), "png").unwrap();
        fs::write(root.join("plugins/Mod/Mod.dll"), "dll").unwrap();

        let names = vec!["manifest.json".to_string(), "icon.png".to_string()];
        let report = remove_matching_files(&RealRuntime, root, &names);

        assert_eq!(report.touched.len(), 3);
        assert!(report.conflicts.is_empty());
        assert!(root.join("plugins/Mod/Mod.dll").exists());
        assert!(!root.join("plugins/Mod/icon.png").exists());
    }
}
