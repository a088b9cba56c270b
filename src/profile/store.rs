//! Profiles persisted as `<profile_root>/<name>.json`.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::ModError;
use crate::package::LoadFailure;
use crate::runtime::Runtime;

use super::Profile;

const PROFILE_EXTENSION: &str = "json";

/// Profiles found under the profile root plus the files that failed to parse.
#[derive(Debug, Default)]
pub struct ProfileListing {
    pub profiles: Vec<Profile>,
    pub failures: Vec<LoadFailure>,
}

pub struct ProfileStore<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> ProfileStore<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns: `<profile_root>/<name>.json`
    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, PROFILE_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.runtime.exists(&self.profile_path(name))
    }

    /// Write a new, empty profile. Fails if one with this name exists.
    #[tracing::instrument(skip(self))]
    pub fn create(&self, name: &str) -> Result<Profile> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(ModError::ProfileAlreadyExists {
                name: name.to_string(),
            }
            .into());
        }

        self.runtime.create_dir_all(&self.root)?;
        let profile = Profile::new(name);
        self.write(&profile)?;
        info!("Created profile {}", name);
        Ok(profile)
    }

    /// Overwrite an existing profile file. Profiles must be created first.
    pub fn save(&self, profile: &Profile) -> Result<()> {
        if !self.exists(&profile.name) {
            return Err(ModError::ProfileNotFound {
                name: profile.name.clone(),
            }
            .into());
        }
        self.write(profile)
    }

    fn write(&self, profile: &Profile) -> Result<()> {
        let path = self.profile_path(&profile.name);
        let content = serde_json::to_string_pretty(profile)?;
        self.runtime
            .write(&path, content.as_bytes())
            .with_context(|| format!("Failed to save profile to {:?}", path))
    }

    pub fn load(&self, name: &str) -> Result<Profile> {
        let path = self.profile_path(name);
        if !self.runtime.exists(&path) {
            return Err(ModError::ProfileNotFound {
                name: name.to_string(),
            }
            .into());
        }
        self.load_file(&path)
    }

    /// The file stem is the profile's name; a file whose `name` field
    /// disagrees with it is rejected.
    fn load_file(&self, path: &Path) -> Result<Profile> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Profile file {:?} has no usable name", path))?;
        validate_name(stem)?;

        let content = self.runtime.read_to_string(path)?;
        let profile: Profile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile {:?}", path))?;
        if profile.name != stem {
            anyhow::bail!(
                "Profile {:?} calls itself '{}' but its file is named '{}'",
                path,
                profile.name,
                stem
            );
        }
        Ok(profile)
    }

    /// Remove the profile file. The instance directory is left alone.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.profile_path(name);
        if !self.runtime.exists(&path) {
            debug!("Profile {} does not exist", name);
            return Ok(false);
        }
        self.runtime.remove_file(&path)?;
        info!("Deleted profile {}", name);
        Ok(true)
    }

    /// Every parsable profile, sorted by name.
    pub fn list(&self) -> Result<ProfileListing> {
        let mut listing = ProfileListing::default();
        if !self.runtime.exists(&self.root) {
            return Ok(listing);
        }

        for path in self.runtime.read_dir(&self.root)? {
            if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION)
                || self.runtime.is_dir(&path)
            {
                continue;
            }
            match self.load_file(&path) {
                Ok(profile) => listing.profiles.push(profile),
                Err(error) => {
                    warn!("Skipping profile {:?}: {:#}", path, error);
                    listing.failures.push(LoadFailure { path, error });
                }
            }
        }

        listing.profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }
}

/// Profile names become file names.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.trim() != name
    {
        anyhow::bail!("Invalid profile name '{}'", name);
    }
    Ok(())
}
