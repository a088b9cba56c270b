//! Error taxonomy for store, catalog and deployment operations.
//!
//! Core functions return `anyhow::Result`; the variants below are the root
//! causes callers can classify with `err.downcast_ref::<ModError>()`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single file that could not be copied, moved or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileConflict {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for FileConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

#[derive(Debug, Error)]
pub enum ModError {
    #[error("Invalid package name '{name}': expected <owner>-<name>-<version>")]
    InvalidPackageName { name: String },

    #[error("Invalid manifest in {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Failed to extract {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Catalog cache at {path} is stale")]
    CacheStale { path: PathBuf },

    #[error("Loader sentinel {sentinel} did not appear within {waited:?}")]
    DeploymentTimeout { sentinel: PathBuf, waited: Duration },

    #[error("Deployment was cancelled while waiting for {sentinel}")]
    DeploymentCancelled { sentinel: PathBuf },

    #[error("{} file(s) could not be transferred: {}", conflicts.len(), summarize(conflicts))]
    FilesystemConflict { conflicts: Vec<FileConflict> },

    #[error("Package not found: {name}")]
    PackageNotFound { name: String },

    #[error("Profile not found: {name}")]
    ProfileNotFound { name: String },

    #[error("Profile already exists: {name}")]
    ProfileAlreadyExists { name: String },
}

fn summarize(conflicts: &[FileConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Returns the `ModError` carried by an `anyhow` error, either as its root
/// cause or as attached context.
pub fn classify(err: &anyhow::Error) -> Option<&ModError> {
    err.downcast_ref::<ModError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<ModError>()))
}
