//! Unpacking package archives into a store version directory.

mod zip;

use anyhow::Result;
use std::path::Path;

use crate::runtime::Runtime;

pub use zip::ZipExtractor;

pub trait ArchiveExtractor: Send + Sync {
    /// Decided from the file name alone.
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Unpack into `dest`, creating it if needed. Files already present in
    /// `dest` are left alone. Returns how many files were written; any
    /// failure is a `ModError::ExtractionFailed`.
    fn extract<R: Runtime + ?Sized>(&self, runtime: &R, archive_path: &Path, dest: &Path)
    -> Result<usize>;
}
