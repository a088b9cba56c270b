//! Classifies declared dependencies against the installed packages.
//!
//! Matching is by package name, then by exact version string. The resolver
//! never installs anything; mismatches are surfaced as [`VersionConflict`]s
//! for the caller to decide on.

use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;

use crate::package::{DependencySpec, PackageEntry, PackageStore};
use crate::profile::{ModEntry, Profile};
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DependencyStatus {
    Satisfied,
    Missing,
    Mismatched,
}

/// An installed package whose version differs from what a profile entry
/// requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionConflict {
    pub entry_name: String,
    pub dependency: String,
    pub needed_version: String,
    pub existing_version: String,
}

pub struct DependencyResolver {
    installed: Vec<PackageEntry>,
}

impl DependencyResolver {
    pub fn new(installed: Vec<PackageEntry>) -> Self {
        Self { installed }
    }

    /// Snapshot the store's current listing. Package directories that fail
    /// to load count as not installed.
    pub fn from_store<R: Runtime>(store: &PackageStore<'_, R>) -> Result<Self> {
        let listing = store.list()?;
        for failure in &listing.failures {
            warn!(
                "Ignoring unreadable package {:?}: {:#}",
                failure.path, failure.error
            );
        }
        Ok(Self::new(listing.packages))
    }

    pub fn installed(&self) -> &[PackageEntry] {
        &self.installed
    }

    pub fn classify(&self, spec: &DependencySpec) -> DependencyStatus {
        let matches: Vec<&PackageEntry> = self
            .installed
            .iter()
            .filter(|p| p.name == spec.name)
            .collect();

        match matches.as_slice() {
            [] => DependencyStatus::Missing,
            [only] if !only.is_installed() => DependencyStatus::Missing,
            [only] if only.has_version(&spec.version) => DependencyStatus::Satisfied,
            [_] => DependencyStatus::Mismatched,
            // Only reachable with duplicate names in the listing.
            many if many.iter().any(|p| p.has_version(&spec.version)) => {
                DependencyStatus::Satisfied
            }
            _ => DependencyStatus::Mismatched,
        }
    }

    /// Recompute `missing_dependencies` and `mismatched_dependencies` from
    /// `entry.dependencies`.
    pub fn resolve_entry(&self, entry: &mut ModEntry) {
        entry.missing_dependencies.clear();
        entry.mismatched_dependencies.clear();

        for raw in &entry.dependencies {
            let status = match DependencySpec::parse(raw) {
                Ok(spec) => self.classify(&spec),
                Err(e) => {
                    warn!("{}: unparsable dependency '{}': {:#}", entry.name, raw, e);
                    DependencyStatus::Missing
                }
            };
            debug!("{}: {} is {:?}", entry.name, raw, status);
            match status {
                DependencyStatus::Missing => entry.missing_dependencies.push(raw.clone()),
                DependencyStatus::Mismatched => entry.mismatched_dependencies.push(raw.clone()),
                DependencyStatus::Satisfied => {}
            }
        }
    }

    pub fn resolve_profile(&self, profile: &mut Profile) {
        for entry in &mut profile.entries {
            self.resolve_entry(entry);
        }
    }

    /// Re-read every entry's dependency list from its selected version in
    /// the store, then resolve. An entry whose version is no longer installed
    /// keeps an empty dependency list.
    pub fn refresh_profile<R: Runtime>(&self, store: &PackageStore<'_, R>, profile: &mut Profile) {
        for entry in &mut profile.entries {
            entry.dependencies = match store.load_version(&entry.name, &entry.selected_version) {
                Ok(package) => package.dependencies,
                Err(e) => {
                    warn!(
                        "Cannot read {} {}: {:#}",
                        entry.name, entry.selected_version, e
                    );
                    vec![]
                }
            };
            self.resolve_entry(entry);
        }
    }

    /// One triple per mismatched dependency of a resolved profile.
    pub fn conflicts(&self, profile: &Profile) -> Vec<VersionConflict> {
        let mut conflicts = Vec::new();
        for entry in &profile.entries {
            for raw in &entry.mismatched_dependencies {
                let Ok(spec) = DependencySpec::parse(raw) else {
                    continue;
                };
                let Some(existing) = self
                    .installed
                    .iter()
                    .find(|p| p.name == spec.name)
                    .and_then(|p| p.newest_version())
                else {
                    continue;
                };
                conflicts.push(VersionConflict {
                    entry_name: entry.name.clone(),
                    dependency: raw.clone(),
                    needed_version: spec.version,
                    existing_version: existing.to_string(),
                });
            }
        }
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::write_package_zip;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn installed(name: &str, versions: &[&str]) -> PackageEntry {
        PackageEntry {
            name: name.into(),
            path: PathBuf::from("/store").join(name),
            installed_versions: versions.iter().map(|v| v.to_string()).collect(),
            selected_version: versions.first().map(|v| v.to_string()).unwrap_or_default(),
            author: None,
            description: None,
            website: None,
            icon: None,
            readme: None,
            changelog: None,
            dependencies: vec![],
        }
    }

    fn spec(raw: &str) -> DependencySpec {
        DependencySpec::parse(raw).unwrap()
    }

    #[test]
    fn test_classify_against_single_match() {
        let resolver = DependencyResolver::new(vec![installed("Modname", &["2.0.0", "1.0.0"])]);

        assert_eq!(
            resolver.classify(&spec("Owner-Modname-1.0.0")),
            DependencyStatus::Satisfied
        );
        assert_eq!(
            resolver.classify(&spec("Owner-Modname-3.0.0")),
            DependencyStatus::Mismatched
        );
        assert_eq!(
            resolver.classify(&spec("Owner-Other-1.0.0")),
            DependencyStatus::Missing
        );
    }

    #[test]
    fn test_classify_known_but_not_materialized_is_missing() {
        let resolver = DependencyResolver::new(vec![installed("Modname", &[])]);
        assert_eq!(
            resolver.classify(&spec("Owner-Modname-1.0.0")),
            DependencyStatus::Missing
        );
    }

    #[test]
    fn test_classify_duplicate_names() {
        let resolver = DependencyResolver::new(vec![
            installed("Modname", &["1.0.0"]),
            installed("Modname", &["2.0.0"]),
        ]);

        assert_eq!(
            resolver.classify(&spec("Owner-Modname-2.0.0")),
            DependencyStatus::Satisfied
        );
        assert_eq!(
            resolver.classify(&spec("Owner-Modname-3.0.0")),
            DependencyStatus::Mismatched
        );
    }

    #[test]
    fn test_version_match_is_exact_string() {
        let resolver = DependencyResolver::new(vec![installed("Modname", &["1.0.0"])]);
        assert_eq!(
            resolver.classify(&spec("Owner-Modname-1.0")),
            DependencyStatus::Mismatched
        );
    }

    #[test]
    fn test_resolve_profile_populates_lists_and_conflicts() {
        let resolver = DependencyResolver::new(vec![installed("Modname", &["2.0.0", "1.0.0"])]);
        let mut entry = ModEntry::new("Consumer", PathBuf::from("/store/Consumer"), "1.0.0");
        entry.dependencies = vec![
            "Owner-Modname-1.0.0".into(),
            "Owner-Modname-3.0.0".into(),
            "Owner-Other-1.0.0".into(),
            "garbage".into(),
        ];
        let mut profile = Profile {
            name: "default".into(),
            entries: vec![entry],
        };

        resolver.resolve_profile(&mut profile);

        let entry = &profile.entries[0];
        assert_eq!(
            entry.missing_dependencies,
            vec!["Owner-Other-1.0.0", "garbage"]
        );
        assert_eq!(entry.mismatched_dependencies, vec!["Owner-Modname-3.0.0"]);
        assert!(entry.has_incompatibility());

        let conflicts = resolver.conflicts(&profile);
        assert_eq!(
            conflicts,
            vec![VersionConflict {
                entry_name: "Consumer".into(),
                dependency: "Owner-Modname-3.0.0".into(),
                needed_version: "3.0.0".into(),
                existing_version: "2.0.0".into(),
            }]
        );
    }

    #[test]
    fn test_resolve_entry_clears_previous_results() {
        let resolver = DependencyResolver::new(vec![installed("Modname", &["1.0.0"])]);
        let mut entry = ModEntry::new("Consumer", PathBuf::from("/store/Consumer"), "1.0.0");
        entry.missing_dependencies.push("Owner-Modname-1.0.0".into());
        entry.dependencies = vec!["Owner-Modname-1.0.0".into()];

        resolver.resolve_entry(&mut entry);

        assert!(!entry.has_incompatibility());
    }

    #[test]
    fn test_refresh_profile_reads_selected_version_dependencies() {
        let dir = tempdir().unwrap();
        let store = PackageStore::new(&RealRuntime, dir.path().join("store"));
        store
            .install(&write_package_zip(dir.path(), "Owner", "Dep", "1.0.0", &[]))
            .unwrap();
        store
            .install(&write_package_zip(
                dir.path(),
                "Owner",
                "Consumer",
                "1.0.0",
                &["Owner-Dep-1.0.0", "Owner-Missing-0.1.0"],
            ))
            .unwrap();
        let consumer = store.get("Consumer").unwrap().unwrap();
        let mut profile = Profile::new("default");
        profile.add_entry(&consumer);
        profile.entries[0].dependencies.clear();

        let resolver = DependencyResolver::from_store(&store).unwrap();
        resolver.refresh_profile(&store, &mut profile);

        let entry = &profile.entries[0];
        assert_eq!(entry.dependencies.len(), 2);
        assert_eq!(entry.missing_dependencies, vec!["Owner-Missing-0.1.0"]);
        assert!(entry.mismatched_dependencies.is_empty());
    }
}
