//! `std::fs` primitives with the offending path in every error.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[tracing::instrument]
pub(super) fn list_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Cannot list {:?}", dir))?;
    let mut children = Vec::new();
    for entry in entries {
        children.push(entry.with_context(|| format!("Cannot list {:?}", dir))?.path());
    }
    Ok(children)
}

#[tracing::instrument]
pub(super) fn make_dirs(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create directory {:?}", dir))
}

#[tracing::instrument]
pub(super) fn remove_tree(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir).with_context(|| format!("Cannot remove directory {:?}", dir))
}

#[tracing::instrument]
pub(super) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Cannot read {:?}", path))
}

#[tracing::instrument]
pub(super) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read {:?} as text", path))
}

#[tracing::instrument(skip(contents), fields(len = contents.len()))]
pub(super) fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Cannot write {:?}", path))
}

#[tracing::instrument]
pub(super) fn open_reader(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Cannot open {:?}", path))
}

#[tracing::instrument]
pub(super) fn create_writer(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Cannot create {:?}", path))
}

#[tracing::instrument]
pub(super) fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    fs::copy(from, to).with_context(|| format!("Cannot copy {:?} to {:?}", from, to))
}

#[tracing::instrument]
pub(super) fn rename_path(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).with_context(|| format!("Cannot move {:?} to {:?}", from, to))
}

#[tracing::instrument]
pub(super) fn remove_one(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("Cannot remove {:?}", path))
}

#[cfg(unix)]
#[tracing::instrument]
pub(super) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Cannot set mode {:o} on {:?}", mode, path))
}

#[cfg(not(unix))]
pub(super) fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[tracing::instrument]
pub(super) fn last_write(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("Cannot read last-write time of {:?}", path))
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use crate::test_utils::set_age;
    use std::io::{Read, Write};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_profile_file_write_read_and_replace() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join("profiles/default.json");

        RealRuntime.create_dir_all(profile.parent().unwrap()).unwrap();
        RealRuntime.write(&profile, br#"{"name":"default"}"#).unwrap();
        assert_eq!(
            RealRuntime.read_to_string(&profile).unwrap(),
            r#"{"name":"default"}"#
        );

        let staged = dir.path().join("profiles/default.json.tmp");
        RealRuntime.write(&staged, b"{}").unwrap();
        RealRuntime.rename(&staged, &profile).unwrap();
        assert!(!RealRuntime.exists(&staged));
        assert_eq!(RealRuntime.read(&profile).unwrap(), b"{}");
    }

    #[test]
    fn test_version_dirs_are_listed_and_removed() {
        let dir = tempdir().unwrap();
        let package = dir.path().join("store/Modname");
        for version in ["1.0.0", "2.0.0"] {
            RealRuntime.create_dir_all(&package.join(version)).unwrap();
        }

        let mut versions = RealRuntime.read_dir(&package).unwrap();
        versions.sort();
        assert_eq!(versions, vec![package.join("1.0.0"), package.join("2.0.0")]);
        assert!(versions.iter().all(|v| RealRuntime.is_dir(v)));

        RealRuntime.remove_dir_all(&package).unwrap();
        assert!(!RealRuntime.exists(&package));
    }

    #[test]
    fn test_streamed_download_can_be_copied_and_removed() {
        let dir = tempdir().unwrap();
        let part = dir.path().join("Owner-Modname-1.0.0.zip.part");
        {
            let mut out = RealRuntime.create_file(&part).unwrap();
            out.write_all(b"PK\x03\x04").unwrap();
        }

        let kept = dir.path().join("Owner-Modname-1.0.0.zip");
        assert_eq!(RealRuntime.copy(&part, &kept).unwrap(), 4);
        RealRuntime.remove_file(&part).unwrap();

        let mut body = Vec::new();
        RealRuntime.open(&kept).unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(body, b"PK\x03\x04");
    }

    #[test]
    fn test_modified_reflects_file_age() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        RealRuntime.write(&path, b"[]").unwrap();
        set_age(&path, Duration::from_secs(25 * 3600));

        let age = RealRuntime
            .now()
            .duration_since(RealRuntime.modified(&path).unwrap())
            .unwrap();
        assert!(age >= Duration::from_secs(25 * 3600));
        assert!(age < Duration::from_secs(25 * 3600 + 60));
    }

    #[cfg(unix)]
    #[test]
    fn test_set_permissions_applies_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.sh");
        RealRuntime.write(&path, b"#!/bin/sh").unwrap();

        RealRuntime.set_permissions(&path, 0o755).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_errors_name_the_path() {
        let missing = std::path::Path::new("/nonexistent/modbay/store");

        let err = RealRuntime.read_dir(missing).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/modbay/store"));
        assert!(RealRuntime.modified(missing).is_err());
        assert!(RealRuntime.remove_file(missing).is_err());
    }
}
