//! Where a package's files go inside the target directory.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::LoaderLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Copied onto the target root as-is.
    TargetRoot,
    /// The nested installer folder is copied onto the target root.
    InstallerRoot,
    /// Copied into the loader directory.
    LoaderRoot,
    /// Copied into `<plugins>/<package name>`.
    Plugins,
}

impl Placement {
    /// Infer placement from the top-level directories of a package's files.
    pub fn infer<R: Runtime + ?Sized>(
        runtime: &R,
        layout: &LoaderLayout,
        package_name: &str,
        source: &Path,
    ) -> Result<Self> {
        let subdirs = top_level_dirs(runtime, source)?;

        if package_name == layout.installer_package {
            return Ok(if subdirs.contains(&layout.installer_package) {
                Placement::InstallerRoot
            } else {
                Placement::TargetRoot
            });
        }

        Ok(match subdirs.as_slice() {
            [] => Placement::Plugins,
            [only] if *only == layout.loader_dir => Placement::TargetRoot,
            [only] if *only == layout.installer_package => Placement::InstallerRoot,
            [_] => Placement::LoaderRoot,
            many if many.contains(&layout.loader_dir) => Placement::TargetRoot,
            _ => Placement::LoaderRoot,
        })
    }

    /// Returns `(copy from, copy into)` for this placement.
    pub fn paths(
        &self,
        layout: &LoaderLayout,
        package_name: &str,
        source: &Path,
        target: &Path,
    ) -> (PathBuf, PathBuf) {
        match self {
            Placement::TargetRoot => (source.to_path_buf(), target.to_path_buf()),
            Placement::InstallerRoot => (
                source.join(&layout.installer_package),
                target.to_path_buf(),
            ),
            Placement::LoaderRoot => (source.to_path_buf(), layout.loader_root(target)),
            Placement::Plugins => (
                source.to_path_buf(),
                layout.plugins_root(target).join(package_name),
            ),
        }
    }
}

fn top_level_dirs<R: Runtime + ?Sized>(runtime: &R, source: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    for path in runtime.read_dir(source)? {
        if runtime.is_dir(&path)
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            dirs.push(name.to_string());
        }
    }
    dirs.sort();
    Ok(dirs)
}
