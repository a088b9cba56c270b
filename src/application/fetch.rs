//! Fetch use case: complete a profile's dependencies from the catalog.
//!
//! This use case coordinates:
//! - Dependency resolution against the store
//! - Catalog lookup of missing specs (exact version only)
//! - Sequential download and install
//! - Surfacing version conflicts for the caller to decide

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::catalog::{RemoteCatalog, RemoteVersion};
use crate::error::ModError;
use crate::package::{DependencySpec, InstallOutcome, Package, PackageStore};
use crate::profile::Profile;
use crate::resolver::{DependencyResolver, VersionConflict};
use crate::runtime::Runtime;

/// Where missing packages come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// The catalog entry for `<owner>-<name>` at exactly `version`.
    async fn find_version(&self, full_name: &str, version: &str) -> Result<Option<RemoteVersion>>;

    /// Local path of the downloaded archive, `None` if the download failed.
    async fn download(&self, version: &RemoteVersion) -> Result<Option<PathBuf>>;
}

#[async_trait]
impl<R: Runtime> PackageSource for RemoteCatalog<'_, R> {
    async fn find_version(&self, full_name: &str, version: &str) -> Result<Option<RemoteVersion>> {
        let listings = self.get().await?;
        Ok(listings
            .get(full_name)
            .and_then(|listing| listing.version(version))
            .cloned())
    }

    async fn download(&self, version: &RemoteVersion) -> Result<Option<PathBuf>> {
        self.download_archive(version, None).await
    }
}

/// The caller's answer to a [`VersionConflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    KeepExisting,
    InstallNeeded,
}

#[derive(Debug, Default)]
pub struct FetchReport {
    /// Dependency specs that were downloaded and installed.
    pub installed: Vec<String>,
    /// Specs the catalog does not know at the required version.
    pub unavailable: Vec<Package>,
    /// Specs whose lookup, download or install failed.
    pub failures: Vec<(String, anyhow::Error)>,
    /// Remaining mismatches after installing.
    pub conflicts: Vec<VersionConflict>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty() && self.failures.is_empty() && self.conflicts.is_empty()
    }
}

pub struct DependencyFetcher<'s, 'a, R: Runtime, S: PackageSource> {
    store: &'s PackageStore<'a, R>,
    source: &'s S,
}

impl<'s, 'a, R: Runtime, S: PackageSource> DependencyFetcher<'s, 'a, R, S> {
    pub fn new(store: &'s PackageStore<'a, R>, source: &'s S) -> Self {
        Self { store, source }
    }

    /// Resolve `profile`, then install every distinct missing dependency one
    /// at a time. Each installed dependency is added to the profile, and the
    /// profile's dependency lists are left up to date.
    #[tracing::instrument(skip(self, profile), fields(profile = %profile.name))]
    pub async fn fetch_missing(&self, profile: &mut Profile) -> Result<FetchReport> {
        let resolver = DependencyResolver::from_store(self.store)?;
        resolver.refresh_profile(self.store, profile);

        let mut missing: Vec<String> = Vec::new();
        for entry in &profile.entries {
            for raw in &entry.missing_dependencies {
                if !missing.contains(raw) {
                    missing.push(raw.clone());
                }
            }
        }
        debug!("{} missing dependency spec(s)", missing.len());

        let mut report = FetchReport::default();
        for raw in missing {
            let spec = match DependencySpec::parse(&raw) {
                Ok(spec) => spec,
                Err(e) => {
                    report.failures.push((raw, e));
                    continue;
                }
            };
            match self.fetch_into(profile, &spec).await {
                Ok(Some(_)) => report.installed.push(raw),
                Ok(None) => {
                    info!("{} is not available in the catalog", raw);
                    report.unavailable.push(Package::Placeholder(spec));
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {:#}", raw, e);
                    report.failures.push((raw, e));
                }
            }
        }

        let resolver = DependencyResolver::from_store(self.store)?;
        resolver.refresh_profile(self.store, profile);
        report.conflicts = resolver.conflicts(profile);
        Ok(report)
    }

    /// `Ok(None)` when the catalog has no such version.
    async fn fetch_one(&self, spec: &DependencySpec) -> Result<Option<InstallOutcome>> {
        let Some(version) = self
            .source
            .find_version(&spec.full_name(), &spec.version)
            .await?
        else {
            return Ok(None);
        };

        let archive = self
            .source
            .download(&version)
            .await?
            .ok_or_else(|| ModError::NetworkFailure(format!("download of {} failed", version.full_name)))?;

        self.store.install(&archive).map(Some)
    }

    /// [`fetch_one`](Self::fetch_one), then select the installed version
    /// in `profile`.
    async fn fetch_into(
        &self,
        profile: &mut Profile,
        spec: &DependencySpec,
    ) -> Result<Option<InstallOutcome>> {
        let Some(outcome) = self.fetch_one(spec).await? else {
            return Ok(None);
        };
        profile.add_entry(&self.store.load_version(&spec.name, &spec.version)?);
        debug!("Selected {} {} in {}", spec.name, spec.version, profile.name);
        Ok(Some(outcome))
    }

    /// Act on the caller's decision for one conflict. Either way the
    /// dependency ends up selected in `profile`: the installed version when
    /// keeping, the needed one after installing it.
    pub async fn apply_choice(
        &self,
        profile: &mut Profile,
        conflict: &VersionConflict,
        choice: ConflictChoice,
    ) -> Result<Option<InstallOutcome>> {
        let spec = DependencySpec::parse(&conflict.dependency)?;
        match choice {
            ConflictChoice::KeepExisting => {
                debug!(
                    "Keeping {} for {}",
                    conflict.existing_version, conflict.entry_name
                );
                if profile.entry(&spec.name).is_none() {
                    profile.add_entry(
                        &self
                            .store
                            .load_version(&spec.name, &conflict.existing_version)?,
                    );
                }
                Ok(None)
            }
            ConflictChoice::InstallNeeded => {
                match self.fetch_into(profile, &spec).await? {
                    Some(outcome) => Ok(Some(outcome)),
                    None => Err(ModError::PackageNotFound {
                        name: conflict.dependency.clone(),
                    }
                    .into()),
                }
            }
        }
    }
}
