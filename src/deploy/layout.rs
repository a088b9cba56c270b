use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::package::{CHANGELOG_FILE, ICON_FILE, MANIFEST_FILE, README_FILE};

/// File names the deployer relies on inside the target directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderLayout {
    /// Loader directory at the target root, e.g. `BepInEx`.
    pub loader_dir: String,
    /// Name of the package that ships the loader itself.
    pub installer_package: String,
    /// Plugin directory inside the loader directory.
    pub plugins_dir: String,
    /// Files at the target root that hook the application's startup.
    pub injector_files: Vec<String>,
    /// Appears at the target root once the loader is in place.
    pub sentinel_file: String,
    /// Packaging files scrubbed from the staged loader tree.
    pub metadata_files: Vec<String>,
}

impl Default for LoaderLayout {
    fn default() -> Self {
        Self {
            loader_dir: "BepInEx".into(),
            installer_package: "BepInExPack".into(),
            plugins_dir: "plugins".into(),
            injector_files: vec![
                "winhttp.dll".into(),
                "doorstop_config.ini".into(),
                ".doorstop_version".into(),
            ],
            sentinel_file: "doorstop_config.ini".into(),
            metadata_files: vec![
                ICON_FILE.into(),
                README_FILE.into(),
                CHANGELOG_FILE.into(),
                MANIFEST_FILE.into(),
            ],
        }
    }
}

impl LoaderLayout {
    /// Returns: `<target>/<loader_dir>`
    pub fn loader_root(&self, target: &Path) -> PathBuf {
        target.join(&self.loader_dir)
    }

    /// Returns: `<target>/<loader_dir>/<plugins_dir>`
    pub fn plugins_root(&self, target: &Path) -> PathBuf {
        self.loader_root(target).join(&self.plugins_dir)
    }

    pub fn sentinel(&self, target: &Path) -> PathBuf {
        target.join(&self.sentinel_file)
    }

    /// Top-level names moved between the target and an instance directory:
    /// the loader directory followed by the injector files.
    pub fn staged_units(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.loader_dir.as_str())
            .chain(self.injector_files.iter().map(String::as_str))
    }

    pub fn is_metadata_file(&self, name: &str) -> bool {
        self.metadata_files.iter().any(|m| m == name)
    }
}
