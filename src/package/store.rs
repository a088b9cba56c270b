//! On-disk package store.
//!
//! Layout: `<store_root>/<name>/<version>/<package files>`. A package exists
//! exactly when its directory holds at least one version directory.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveExtractor, ZipExtractor};
use crate::cleanup::RollbackGuard;
use crate::error::ModError;
use crate::runtime::{ExistingPolicy, Runtime, copy_tree};

use super::manifest::{CHANGELOG_FILE, ICON_FILE, MANIFEST_FILE, README_FILE, parse_manifest};
use super::name::parse_package_file_name;
use super::version::sort_descending;
use super::PackageEntry;

/// Result of a single install.
#[derive(Debug)]
pub enum InstallOutcome {
    Installed(PackageEntry),
    /// The version directory already existed; nothing was touched.
    AlreadyPresent { name: String, version: String },
}

impl InstallOutcome {
    pub fn name(&self) -> &str {
        match self {
            InstallOutcome::Installed(entry) => &entry.name,
            InstallOutcome::AlreadyPresent { name, .. } => name,
        }
    }
}

/// A package directory (or install source) that could not be processed.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Listing of the store plus the package directories that were skipped.
#[derive(Debug, Default)]
pub struct StoreListing {
    pub packages: Vec<PackageEntry>,
    pub failures: Vec<LoadFailure>,
}

#[derive(Debug, Default)]
pub struct BulkInstallReport {
    pub outcomes: Vec<InstallOutcome>,
    pub failures: Vec<LoadFailure>,
}

pub struct PackageStore<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
    extractor: ZipExtractor,
}

impl<'a, R: Runtime> PackageStore<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self {
            runtime,
            root,
            extractor: ZipExtractor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns: `<store_root>/<name>`
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns: `<store_root>/<name>/<version>`
    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.package_dir(name).join(version)
    }

    /// Install a package archive or directory named
    /// `<owner>-<name>-<version>[ (N)][.ext]`.
    ///
    /// Installing a version that is already present is a no-op. A failed
    /// extraction or unreadable manifest removes everything this call created.
    #[tracing::instrument(skip(self))]
    pub fn install(&self, source: &Path) -> Result<InstallOutcome> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ModError::InvalidPackageName {
                name: source.display().to_string(),
            })?;
        let spec = parse_package_file_name(file_name)?;

        let package_dir = self.package_dir(&spec.name);
        let dest = package_dir.join(&spec.version);
        if self.runtime.exists(&dest) {
            debug!("{} {} is already installed", spec.name, spec.version);
            return Ok(InstallOutcome::AlreadyPresent {
                name: spec.name,
                version: spec.version,
            });
        }

        // Roll back the package directory too when this is its first version,
        // so no empty package directory survives a failure.
        let rollback_path = if self.runtime.exists(&package_dir) {
            dest.clone()
        } else {
            package_dir
        };
        let guard = RollbackGuard::new(self.runtime, rollback_path);

        self.stage_files(source, &dest)?;
        let entry = self.load_version(&spec.name, &spec.version)?;

        guard.commit();
        info!("Installed {} {}", entry.name, entry.selected_version);
        Ok(InstallOutcome::Installed(entry))
    }

    fn stage_files(&self, source: &Path, dest: &Path) -> Result<()> {
        if self.runtime.is_dir(source) {
            self.runtime.create_dir_all(dest)?;
            let report = copy_tree(self.runtime, source, dest, ExistingPolicy::Skip);
            if !report.conflicts.is_empty() {
                return Err(ModError::ExtractionFailed {
                    path: source.to_path_buf(),
                    reason: ModError::FilesystemConflict {
                        conflicts: report.conflicts,
                    }
                    .to_string(),
                }
                .into());
            }
            return Ok(());
        }

        if !self.extractor.can_handle(source) {
            return Err(ModError::ExtractionFailed {
                path: source.to_path_buf(),
                reason: "unsupported archive format".to_string(),
            }
            .into());
        }
        self.extractor.extract(self.runtime, source, dest)?;
        Ok(())
    }

    /// Install several sources, collecting failures instead of stopping.
    pub fn install_all(&self, sources: &[PathBuf]) -> BulkInstallReport {
        let mut report = BulkInstallReport::default();
        for source in sources {
            match self.install(source) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => {
                    warn!("Failed to install {:?}: {:#}", source, error);
                    report.failures.push(LoadFailure {
                        path: source.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    /// Installed version directory names of a package, newest first.
    pub fn installed_versions(&self, name: &str) -> Result<Vec<String>> {
        let package_dir = self.package_dir(name);
        if !self.runtime.is_dir(&package_dir) {
            return Ok(vec![]);
        }

        let mut versions = Vec::new();
        for path in self.runtime.read_dir(&package_dir)? {
            if let Some(version) = path.file_name().and_then(|n| n.to_str())
                && self.runtime.is_dir(&path)
            {
                versions.push(version.to_string());
            }
        }
        sort_descending(&mut versions);
        Ok(versions)
    }

    /// Describe a package through one specific installed version.
    #[tracing::instrument(skip(self))]
    pub fn load_version(&self, name: &str, version: &str) -> Result<PackageEntry> {
        let version_dir = self.version_dir(name, version);
        let manifest_path = version_dir.join(MANIFEST_FILE);

        let manifest = self
            .runtime
            .read(&manifest_path)
            .and_then(|bytes| parse_manifest(&bytes))
            .map_err(|e| ModError::ManifestInvalid {
                path: manifest_path.clone(),
                reason: format!("{:#}", e),
            })?;

        let icon = version_dir.join(ICON_FILE);
        let readme = self.read_optional(&version_dir.join(README_FILE));
        let changelog = self.read_optional(&version_dir.join(CHANGELOG_FILE));

        Ok(PackageEntry {
            name: name.to_string(),
            path: self.package_dir(name),
            installed_versions: self.installed_versions(name)?,
            selected_version: version.to_string(),
            author: manifest.author,
            description: manifest.description,
            website: manifest.website_url,
            icon: self.runtime.exists(&icon).then_some(icon),
            readme,
            changelog,
            dependencies: manifest.dependencies,
        })
    }

    fn read_optional(&self, path: &Path) -> Option<String> {
        if !self.runtime.exists(path) {
            return None;
        }
        match self.runtime.read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Ignoring unreadable {:?}: {}", path, e);
                None
            }
        }
    }

    /// Look up one package, described by its newest version.
    pub fn get(&self, name: &str) -> Result<Option<PackageEntry>> {
        let versions = self.installed_versions(name)?;
        match versions.first() {
            Some(newest) => self.load_version(name, newest).map(Some),
            None => Ok(None),
        }
    }

    /// One entry per package directory, described by its newest version.
    /// Directories that fail to load are reported in `failures`.
    #[tracing::instrument(skip(self))]
    pub fn list(&self) -> Result<StoreListing> {
        let mut listing = StoreListing::default();
        if !self.runtime.exists(&self.root) {
            return Ok(listing);
        }

        for package_dir in self.runtime.read_dir(&self.root)? {
            if !self.runtime.is_dir(&package_dir) {
                continue;
            }
            let Some(name) = package_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match self.get(name) {
                Ok(Some(entry)) => listing.packages.push(entry),
                Ok(None) => listing.failures.push(LoadFailure {
                    path: package_dir.clone(),
                    error: anyhow::anyhow!("no installed versions"),
                }),
                Err(error) => {
                    warn!("Skipping package {:?}: {:#}", package_dir, error);
                    listing.failures.push(LoadFailure {
                        path: package_dir.clone(),
                        error,
                    });
                }
            }
        }

        listing.packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    /// Delete a package with all its versions. Returns whether anything
    /// was removed.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<bool> {
        let package_dir = self.package_dir(name);
        if !self.runtime.exists(&package_dir) {
            debug!("{} is not installed, nothing to remove", name);
            return Ok(false);
        }
        self.runtime
            .remove_dir_all(&package_dir)
            .with_context(|| format!("Failed to remove {:?}", package_dir))?;
        info!("Removed {}", name);
        Ok(true)
    }

    /// Match a glob pattern against package names and directory names.
    /// A pattern without wildcards matches as a substring.
    pub fn search(&self, pattern: &str, case_sensitive: bool) -> Vec<PackageEntry> {
        let listing = match self.list() {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Failed to list packages for search: {:#}", e);
                return vec![];
            }
        };

        let matcher = build_pattern(pattern);
        let options = MatchOptions {
            case_sensitive,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        listing
            .packages
            .into_iter()
            .filter(|entry| {
                matcher.matches_with(&entry.name, options)
                    || matcher.matches_with(entry.file_name(), options)
            })
            .collect()
    }
}

fn build_pattern(pattern: &str) -> Pattern {
    let has_wildcard = pattern.contains(['*', '?', '[']);
    let source = if has_wildcard {
        pattern.to_string()
    } else {
        format!("*{}*", Pattern::escape(pattern))
    };
    Pattern::new(&source).unwrap_or_else(|_| {
        Pattern::new(&format!("*{}*", Pattern::escape(pattern))).unwrap_or_default()
    })
}
