use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::package::PackageEntry;

/// One package selected into a profile.
///
/// Only `name`, `path` and `selected_version` are persisted; the dependency
/// lists are recomputed by the resolver after every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModEntry {
    pub name: String,
    /// `<store_root>/<name>`
    pub path: PathBuf,
    pub selected_version: String,
    #[serde(skip)]
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub missing_dependencies: Vec<String>,
    #[serde(skip)]
    pub mismatched_dependencies: Vec<String>,
}

impl ModEntry {
    pub fn new(name: impl Into<String>, path: PathBuf, selected_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path,
            selected_version: selected_version.into(),
            dependencies: vec![],
            missing_dependencies: vec![],
            mismatched_dependencies: vec![],
        }
    }

    /// Directory holding the files of the selected version.
    pub fn source_dir(&self) -> PathBuf {
        self.path.join(&self.selected_version)
    }

    pub fn has_missing(&self) -> bool {
        !self.missing_dependencies.is_empty()
    }

    pub fn has_mismatched(&self) -> bool {
        !self.mismatched_dependencies.is_empty()
    }

    pub fn has_incompatibility(&self) -> bool {
        self.has_missing() || self.has_mismatched()
    }
}

impl From<&PackageEntry> for ModEntry {
    fn from(entry: &PackageEntry) -> Self {
        Self {
            dependencies: entry.dependencies.clone(),
            ..ModEntry::new(&entry.name, entry.path.clone(), &entry.selected_version)
        }
    }
}

/// A named, ordered selection of packages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<ModEntry>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: vec![],
        }
    }

    pub fn entry(&self, name: &str) -> Option<&ModEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Add a package, replacing an entry of the same name in place.
    pub fn add_entry(&mut self, package: &PackageEntry) {
        let entry = ModEntry::from(package);
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Returns whether an entry was removed.
    pub fn remove_entry(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    pub fn has_incompatibility(&self) -> bool {
        self.entries.iter().any(ModEntry::has_incompatibility)
    }
}
