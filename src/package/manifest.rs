use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// File names shipped inside every package next to its payload.
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ICON_FILE: &str = "icon.png";
pub const README_FILE: &str = "README.md";
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Package manifest (`manifest.json`)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub name: String,
    pub version_number: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Parse manifest bytes into a new [`Manifest`].
///
/// Accepts a leading UTF-8 byte order mark, which some packaging tools
/// emit. `name` and `version_number` must be non-empty.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let manifest: Manifest =
        serde_json::from_slice(bytes).context("manifest.json is not valid JSON")?;

    if manifest.name.trim().is_empty() {
        bail!("manifest has an empty 'name'");
    }
    if manifest.version_number.trim().is_empty() {
        bail!("manifest has an empty 'version_number'");
    }

    Ok(Manifest {
        website_url: manifest.website_url.filter(|s| !s.is_empty()),
        description: manifest.description.filter(|s| !s.is_empty()),
        ..manifest
    })
}
