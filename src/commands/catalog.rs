use anyhow::Result;
use std::io::Write;
use std::time::Duration;

use crate::catalog::{RemoteCatalog, RemoteListing};
use crate::error::ModError;
use crate::http::{MAX_RETRIES, ProgressObserver, RETRY_DELAY_MS, with_retry};
use crate::package::{InstallOutcome, PackageStore};
use crate::runtime::Runtime;

use super::config::Config;

pub(crate) fn open_catalog<'a, R: Runtime>(
    runtime: &'a R,
    config: &Config,
) -> Result<RemoteCatalog<'a, R>> {
    Ok(RemoteCatalog::new(
        runtime,
        config.http_client()?,
        config.catalog_url.clone(),
        config.catalog_cache_file.clone(),
        config.download_root.clone(),
    ))
}

/// Prints download progress on one terminal line.
pub(crate) fn progress_printer(label: &str) -> impl Fn(u8) + Send + Sync + '_ {
    move |percent| {
        eprint!("\r{} {:>3}%", label, percent);
        if percent == 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }
}

#[tracing::instrument(skip(runtime, config))]
pub async fn refresh<R: Runtime>(runtime: &R, config: &Config, retry: bool) -> Result<()> {
    let catalog = open_catalog(runtime, config)?;
    let count = if retry {
        with_retry(
            "catalog refresh",
            MAX_RETRIES,
            Duration::from_millis(RETRY_DELAY_MS),
            || catalog.refresh(),
        )
        .await?
    } else {
        catalog.refresh().await?
    };
    println!("Catalog refreshed: {} package(s)", count);
    Ok(())
}

fn matches_text(listing: &RemoteListing, needle: &str) -> bool {
    listing.full_name.to_lowercase().contains(needle)
        || listing
            .latest()
            .is_some_and(|v| v.description.to_lowercase().contains(needle))
}

#[tracing::instrument(skip(runtime, config))]
pub async fn search<R: Runtime>(runtime: &R, config: &Config, text: &str) -> Result<()> {
    let catalog = open_catalog(runtime, config)?;
    catalog.get().await?;

    let needle = text.to_lowercase();
    let found = catalog.search(|listing| matches_text(listing, &needle));
    if found.is_empty() {
        println!("No catalog package matches '{}'.", text);
        return Ok(());
    }
    for listing in found {
        match listing.latest() {
            Some(latest) => println!(
                "{} {}  {}",
                listing.full_name, latest.version_number, latest.description
            ),
            None => println!("{}", listing.full_name),
        }
    }
    Ok(())
}

/// Download one catalog package (latest or an exact version) and install it.
#[tracing::instrument(skip(runtime, config))]
pub async fn install<R: Runtime>(
    runtime: &R,
    config: &Config,
    full_name: &str,
    version: Option<&str>,
) -> Result<()> {
    let catalog = open_catalog(runtime, config)?;
    let listings = catalog.get().await?;

    let not_found = || ModError::PackageNotFound {
        name: match version {
            Some(v) => format!("{}-{}", full_name, v),
            None => full_name.to_string(),
        },
    };
    let listing = listings.get(full_name).ok_or_else(not_found)?;
    let remote = match version {
        Some(v) => listing.version(v),
        None => listing.latest(),
    }
    .ok_or_else(not_found)?;

    let observer = progress_printer(&remote.full_name);
    let archive = catalog
        .download_archive(remote, Some(&observer as &dyn ProgressObserver))
        .await?
        .ok_or_else(|| ModError::NetworkFailure(format!("download of {} failed", remote.full_name)))?;

    let store = PackageStore::new(runtime, config.store_root.clone());
    match store.install(&archive)? {
        InstallOutcome::Installed(entry) => {
            println!("Installed {} {}", entry.name, entry.selected_version)
        }
        InstallOutcome::AlreadyPresent { name, version } => {
            println!("{} {} is already installed", name, version)
        }
    }
    Ok(())
}
