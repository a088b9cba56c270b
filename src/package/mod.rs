//! Package management module
//!
//! This module provides the on-disk package store, manifest parsing,
//! `<owner>-<name>-<version>` identifiers and version ordering.

mod entry;
mod manifest;
mod name;
mod store;
mod version;
mod view;

pub use entry::PackageEntry;
pub use manifest::{
    CHANGELOG_FILE, ICON_FILE, MANIFEST_FILE, Manifest, README_FILE, parse_manifest,
};
pub use name::{DependencySpec, parse_package_file_name};
pub use store::{BulkInstallReport, InstallOutcome, LoadFailure, PackageStore, StoreListing};
pub use version::{compare_versions, sort_descending};
pub use view::{Package, PackageDescriptor, lookup};
