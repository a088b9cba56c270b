use anyhow::Result;
use log::info;

use crate::application::{ConflictChoice, DependencyFetcher};
use crate::error::ModError;
use crate::package::PackageStore;
use crate::profile::{Profile, ProfileStore};
use crate::resolver::DependencyResolver;
use crate::runtime::Runtime;

use super::catalog::open_catalog;
use super::config::Config;

/// Load a profile with its dependency lists freshly resolved.
pub(crate) fn load_resolved<R: Runtime>(
    runtime: &R,
    config: &Config,
    name: &str,
) -> Result<Profile> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let store = PackageStore::new(runtime, config.store_root.clone());
    let mut profile = profiles.load(name)?;
    DependencyResolver::from_store(&store)?.refresh_profile(&store, &mut profile);
    Ok(profile)
}

pub fn create<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    profiles.create(name)?;
    println!("Created profile {}", name);
    Ok(())
}

pub fn delete<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    if !profiles.delete(name)? {
        return Err(ModError::ProfileNotFound {
            name: name.to_string(),
        }
        .into());
    }
    println!("Deleted profile {}", name);
    Ok(())
}

pub fn list<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let listing = profiles.list()?;
    for failure in &listing.failures {
        eprintln!("Skipped {}: {:#}", failure.path.display(), failure.error);
    }
    if listing.profiles.is_empty() {
        println!("No profiles.");
        return Ok(());
    }
    for profile in &listing.profiles {
        println!("{} ({} package(s))", profile.name, profile.entries.len());
    }
    Ok(())
}

pub fn show<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let profile = load_resolved(runtime, config, name)?;
    println!("{}", profile.name);
    for entry in &profile.entries {
        let flag = if entry.has_incompatibility() { " !" } else { "" };
        println!("  {} {}{}", entry.name, entry.selected_version, flag);
    }
    Ok(())
}

/// Add an installed package to a profile (newest version unless given).
pub fn add<R: Runtime>(
    runtime: &R,
    config: &Config,
    profile_name: &str,
    package: &str,
    version: Option<&str>,
) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let store = PackageStore::new(runtime, config.store_root.clone());
    let mut profile = profiles.load(profile_name)?;

    let not_installed = || ModError::PackageNotFound {
        name: package.to_string(),
    };
    let entry = match version {
        Some(v) => {
            if !store.installed_versions(package)?.iter().any(|i| i == v) {
                return Err(not_installed().into());
            }
            store.load_version(package, v)?
        }
        None => store.get(package)?.ok_or_else(not_installed)?,
    };

    profile.add_entry(&entry);
    profiles.save(&profile)?;
    println!(
        "Added {} {} to {}",
        entry.name, entry.selected_version, profile.name
    );
    Ok(())
}

pub fn drop_package<R: Runtime>(
    runtime: &R,
    config: &Config,
    profile_name: &str,
    package: &str,
) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let mut profile = profiles.load(profile_name)?;
    if !profile.remove_entry(package) {
        anyhow::bail!("{} is not part of profile {}", package, profile_name);
    }
    profiles.save(&profile)?;
    println!("Removed {} from {}", package, profile_name);
    Ok(())
}

/// Print missing and mismatched dependencies.
pub fn check<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let profile = load_resolved(runtime, config, name)?;
    if !profile.has_incompatibility() {
        println!("All dependencies of {} are satisfied.", profile.name);
        return Ok(());
    }
    for entry in profile.entries.iter().filter(|e| e.has_incompatibility()) {
        println!("{}:", entry.name);
        for dep in &entry.missing_dependencies {
            println!("  missing     {}", dep);
        }
        for dep in &entry.mismatched_dependencies {
            println!("  mismatched  {}", dep);
        }
    }
    Ok(())
}

/// Download missing dependencies; mismatches are settled by `choice`.
pub async fn fetch<R: Runtime>(
    runtime: &R,
    config: &Config,
    name: &str,
    choice: ConflictChoice,
) -> Result<()> {
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let store = PackageStore::new(runtime, config.store_root.clone());
    let catalog = open_catalog(runtime, config)?;
    let mut profile = profiles.load(name)?;

    let fetcher = DependencyFetcher::new(&store, &catalog);
    let report = fetcher.fetch_missing(&mut profile).await?;

    for raw in &report.installed {
        println!("Installed {}", raw);
    }
    for package in &report.unavailable {
        let descriptor = package.descriptor();
        println!(
            "Not in catalog: {} {}",
            descriptor.name,
            descriptor.version.unwrap_or_default()
        );
    }
    for (raw, error) in &report.failures {
        eprintln!("Failed to fetch {}: {:#}", raw, error);
    }

    for conflict in &report.conflicts {
        info!(
            "{} needs {} but {} is installed",
            conflict.entry_name, conflict.dependency, conflict.existing_version
        );
        match fetcher.apply_choice(&mut profile, conflict, choice).await {
            Ok(Some(outcome)) => println!("Installed {} {}", outcome.name(), conflict.needed_version),
            Ok(None) => println!(
                "Kept {} {} (wanted {} by {})",
                conflict.dependency, conflict.existing_version, conflict.needed_version, conflict.entry_name
            ),
            Err(e) => eprintln!("Failed to install {}: {:#}", conflict.dependency, e),
        }
    }

    profiles.save(&profile)?;

    if !report.failures.is_empty() {
        anyhow::bail!("{} dependency(ies) could not be fetched", report.failures.len());
    }
    Ok(())
}
