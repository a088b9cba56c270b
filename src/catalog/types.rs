use serde::{Deserialize, Serialize};

/// One package as listed by the remote catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RemoteListing {
    pub name: String,
    /// `<owner>-<name>`, the cache key.
    pub full_name: String,
    pub owner: String,
    pub package_url: String,
    pub versions: Vec<RemoteVersion>,
}

/// One downloadable version of a [`RemoteListing`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RemoteVersion {
    pub name: String,
    /// `<owner>-<name>-<version>`; also the download cache file stem.
    pub full_name: String,
    pub description: String,
    pub icon: String,
    pub version_number: String,
    pub dependencies: Vec<String>,
    pub download_url: String,
    pub downloads: u64,
    pub date_created: String,
    pub website_url: String,
    pub is_active: bool,
    pub uuid4: String,
    pub file_size: u64,
}

impl RemoteListing {
    /// Exact match on `version_number`.
    pub fn version(&self, version_number: &str) -> Option<&RemoteVersion> {
        self.versions
            .iter()
            .find(|v| v.version_number == version_number)
    }

    /// The catalog lists versions newest first.
    pub fn latest(&self) -> Option<&RemoteVersion> {
        self.versions.first()
    }
}
