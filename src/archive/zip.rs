use crate::error::ModError;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

use super::ArchiveExtractor;

/// Mod packages as distributed: plain `.zip` files.
pub struct ZipExtractor;

/// What happened to one archive entry.
#[derive(Debug, PartialEq, Eq)]
enum Unpacked {
    File,
    Directory,
    KeptExisting,
    Unsafe,
}

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        archive_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<usize> {
        unpack(runtime, archive_path, extract_to).map_err(|e| {
            ModError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("{:#}", e),
            }
            .into()
        })
    }
}

fn unpack<R: Runtime + ?Sized>(runtime: &R, archive_path: &Path, dest: &Path) -> Result<usize> {
    // The zip reader needs Seek, so the archive is read into memory first.
    let bytes = runtime.read(archive_path)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Not a zip archive")?;
    if archive.is_empty() {
        anyhow::bail!("Archive has no entries");
    }
    runtime.create_dir_all(dest)?;

    let mut files = 0;
    for index in 0..archive.len() {
        match unpack_entry(runtime, &mut archive, index, dest)? {
            (Unpacked::File, _) => files += 1,
            (Unpacked::KeptExisting, name) => debug!("{} already present, keeping it", name),
            (Unpacked::Unsafe, name) => debug!("Skipping {}: path leaves the package", name),
            (Unpacked::Directory, _) => {}
        }
    }

    info!("Unpacked {} file(s) from {:?}", files, archive_path);
    Ok(files)
}

/// Returns the outcome together with the entry's raw name.
fn unpack_entry<R: Runtime + ?Sized>(
    runtime: &R,
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    index: usize,
    dest: &Path,
) -> Result<(Unpacked, String)> {
    let mut entry = archive
        .by_index(index)
        .with_context(|| format!("Unreadable zip entry #{}", index))?;
    let name = entry.name().to_string();
    let Some(relative) = entry.enclosed_name() else {
        return Ok((Unpacked::Unsafe, name));
    };
    let path = dest.join(relative);

    if entry.is_dir() {
        runtime.create_dir_all(&path)?;
        return Ok((Unpacked::Directory, name));
    }
    if runtime.exists(&path) {
        return Ok((Unpacked::KeptExisting, name));
    }

    if let Some(parent) = path.parent() {
        runtime.create_dir_all(parent)?;
    }
    let mut out = runtime.create_file(&path)?;
    std::io::copy(&mut entry, &mut out).with_context(|| format!("Entry {}", name))?;
    drop(out);

    #[cfg(unix)]
    if let Some(mode) = entry.unix_mode()
        && let Err(e) = runtime.set_permissions(&path, mode)
    {
        debug!("Mode {:o} not applied to {:?}: {:#}", mode, path, e);
    }
    Ok((Unpacked::File, name))
}
