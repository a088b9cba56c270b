use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::package::{InstallOutcome, PackageStore};
use crate::runtime::Runtime;

use super::config::Config;

/// Install local archives or directories into the store
#[tracing::instrument(skip(runtime, config))]
pub fn install<R: Runtime>(runtime: &R, config: &Config, sources: &[PathBuf]) -> Result<()> {
    let store = PackageStore::new(runtime, config.store_root.clone());
    let report = store.install_all(sources);

    for outcome in &report.outcomes {
        match outcome {
            InstallOutcome::Installed(entry) => {
                println!("Installed {} {}", entry.name, entry.selected_version)
            }
            InstallOutcome::AlreadyPresent { name, version } => {
                println!("{} {} is already installed", name, version)
            }
        }
    }
    for failure in &report.failures {
        eprintln!("Failed to install {}: {:#}", failure.path.display(), failure.error);
    }

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} package(s) failed to install",
            report.failures.len(),
            sources.len()
        );
    }
    Ok(())
}

/// List all installed packages
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let store = PackageStore::new(runtime, config.store_root.clone());
    debug!("Listing packages from {:?}", store.root());

    let listing = store.list()?;
    for failure in &listing.failures {
        eprintln!("Skipped {}: {:#}", failure.path.display(), failure.error);
    }
    if listing.packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for entry in &listing.packages {
        println!("{} {}", entry.name, entry.installed_versions.join(", "));
    }
    Ok(())
}

#[tracing::instrument(skip(runtime, config))]
pub fn remove<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let store = PackageStore::new(runtime, config.store_root.clone());
    if store.remove(name)? {
        println!("Removed {}", name);
    } else {
        println!("{} is not installed", name);
    }
    Ok(())
}

#[tracing::instrument(skip(runtime, config))]
pub fn search<R: Runtime>(
    runtime: &R,
    config: &Config,
    pattern: &str,
    ignore_case: bool,
) -> Result<()> {
    let store = PackageStore::new(runtime, config.store_root.clone());
    let found = store.search(pattern, !ignore_case);
    if found.is_empty() {
        println!("No installed package matches '{}'.", pattern);
        return Ok(());
    }
    for entry in found {
        println!(
            "{} {}  {}",
            entry.name,
            entry.selected_version,
            entry.description.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::write_package_zip;
    use tempfile::tempdir;

    #[test]
    fn test_install_reports_failures_after_installing_the_rest() {
        let dir = tempdir().unwrap();
        let config = Config::with_root(&dir.path().join("data"));
        let good = write_package_zip(dir.path(), "Owner", "Modname", "1.0.0", &[]);
        let bad = dir.path().join("broken.zip");

        let result = install(&RealRuntime, &config, &[good, bad]);

        assert!(result.is_err());
        assert!(config.store_root.join("Modname/1.0.0").is_dir());
    }

    #[test]
    fn test_remove_missing_package_is_ok() {
        let dir = tempdir().unwrap();
        let config = Config::with_root(dir.path());

        assert!(remove(&RealRuntime, &config, "Ghost").is_ok());
    }
}
