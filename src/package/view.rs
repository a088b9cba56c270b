//! A single tagged view over the three places a package can come from.

use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::RemoteListing;

use super::{DependencySpec, PackageEntry};

/// Fields every package view can provide.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub owner: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub icon: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Package {
    /// Installed in the local store.
    Local(PackageEntry),
    /// Known only to the remote catalog.
    RemoteOnly(RemoteListing),
    /// Referenced by a dependency but found nowhere.
    Placeholder(DependencySpec),
}

impl Package {
    pub fn descriptor(&self) -> PackageDescriptor {
        match self {
            // Store directories carry no owner.
            Package::Local(entry) => PackageDescriptor {
                name: entry.name.clone(),
                owner: None,
                version: Some(entry.selected_version.clone()),
                description: entry.description.clone(),
                website: entry.website.clone(),
                icon: entry.icon.as_ref().map(|p| p.display().to_string()),
                dependencies: entry.dependencies.clone(),
            },
            Package::RemoteOnly(listing) => {
                let latest = listing.latest();
                PackageDescriptor {
                    name: listing.name.clone(),
                    owner: Some(listing.owner.clone()),
                    version: latest.map(|v| v.version_number.clone()),
                    description: latest.map(|v| v.description.clone()),
                    website: latest.map(|v| v.website_url.clone()),
                    icon: latest.map(|v| v.icon.clone()),
                    dependencies: latest.map(|v| v.dependencies.clone()).unwrap_or_default(),
                }
            }
            Package::Placeholder(spec) => PackageDescriptor {
                name: spec.name.clone(),
                owner: Some(spec.owner.clone()),
                version: Some(spec.version.clone()),
                ..Default::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Package::Local(entry) => &entry.name,
            Package::RemoteOnly(listing) => &listing.name,
            Package::Placeholder(spec) => &spec.name,
        }
    }
}

/// Find the most concrete view for a dependency.
///
/// Precedence: an installed package holding the exact version, then the
/// catalog listing, then an installed package with other versions, and a
/// placeholder when nothing knows the name.
pub fn lookup(
    spec: &DependencySpec,
    installed: &[PackageEntry],
    catalog: &HashMap<String, RemoteListing>,
) -> Package {
    let local = installed.iter().find(|e| e.name == spec.name);

    if let Some(entry) = local.filter(|e| e.has_version(&spec.version)) {
        return Package::Local(entry.clone());
    }
    if let Some(listing) = catalog.get(&spec.full_name()) {
        return Package::RemoteOnly(listing.clone());
    }
    match local {
        Some(entry) => Package::Local(entry.clone()),
        None => Package::Placeholder(spec.clone()),
    }
}
