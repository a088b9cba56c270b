use serde::Serialize;
use std::path::PathBuf;

/// An installed package as seen through one of its versions.
///
/// `installed_versions` is ordered newest first; the metadata fields
/// describe `selected_version` only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageEntry {
    pub name: String,
    /// `<store_root>/<name>`
    pub path: PathBuf,
    pub installed_versions: Vec<String>,
    pub selected_version: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub icon: Option<PathBuf>,
    pub readme: Option<String>,
    pub changelog: Option<String>,
    pub dependencies: Vec<String>,
}

impl PackageEntry {
    /// `<store_root>/<name>/<selected_version>`
    pub fn version_dir(&self) -> PathBuf {
        self.path.join(&self.selected_version)
    }

    pub fn is_installed(&self) -> bool {
        !self.installed_versions.is_empty()
    }

    /// Exact string match against the installed version set.
    pub fn has_version(&self, version: &str) -> bool {
        self.installed_versions.iter().any(|v| v == version)
    }

    pub fn newest_version(&self) -> Option<&str> {
        self.installed_versions.first().map(String::as_str)
    }

    /// Directory name of the package inside the store.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> PackageEntry {
        PackageEntry {
            name: "Modname".into(),
            path: PathBuf::from("/store/Modname"),
            installed_versions: vec!["2.0.0".into(), "1.0.0".into()],
            selected_version: "2.0.0".into(),
            author: None,
            description: None,
            website: None,
            icon: None,
            readme: None,
            changelog: None,
            dependencies: vec![],
        }
    }

    #[test]
    fn test_version_helpers() {
        let entry = entry();
        assert_eq!(entry.version_dir(), PathBuf::from("/store/Modname/2.0.0"));
        assert!(entry.is_installed());
        assert!(entry.has_version("1.0.0"));
        assert!(!entry.has_version("1.0"));
        assert_eq!(entry.newest_version(), Some("2.0.0"));
        assert_eq!(entry.file_name(), "Modname");
    }
}
