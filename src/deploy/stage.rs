//! Staging a profile into the target directory and back out again.
//!
//! Between runs a profile's loader directory and injector files live in its
//! instance directory. Staging either moves them back (fast path) or
//! rebuilds them from the package store; unstaging always moves them out.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{FileConflict, ModError, classify};
use crate::profile::Profile;
use crate::runtime::tree::TreeReport;
use crate::runtime::{ExistingPolicy, Runtime, copy_tree, move_path, remove_matching_files};

use super::{CancelToken, LoaderLayout, Placement, SentinelWait};

/// A profile file written more recently than this marks a re-entry.
pub const FAST_PATH_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DeployerConfig {
    pub target_dir: PathBuf,
    pub instance_root: PathBuf,
    pub layout: LoaderLayout,
    pub wait: SentinelWait,
}

#[derive(Debug, Default)]
pub struct StageReport {
    /// Files were moved back from the instance directory.
    pub fast_path: bool,
    pub placed: Vec<PathBuf>,
    /// Files kept because they already existed in the target.
    pub skipped: Vec<PathBuf>,
    pub scrubbed: Vec<PathBuf>,
    /// Metadata files that could not be scrubbed. Not fatal.
    pub conflicts: Vec<FileConflict>,
}

#[derive(Debug, Default)]
pub struct UnstageReport {
    /// Paths now inside the instance directory.
    pub moved: Vec<PathBuf>,
}

pub struct Deployer<'a, R: Runtime> {
    runtime: &'a R,
    config: DeployerConfig,
}

impl<'a, R: Runtime> Deployer<'a, R> {
    pub fn new(runtime: &'a R, config: DeployerConfig) -> Self {
        Self { runtime, config }
    }

    pub fn target_dir(&self) -> &Path {
        &self.config.target_dir
    }

    /// Returns: `<instance_root>/<profile name>`
    ///
    /// The name must be a single plain path component; the result is always
    /// a direct child of the instance root.
    pub fn instance_dir(&self, profile_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(profile_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == profile_name => {
                Ok(self.config.instance_root.join(part))
            }
            _ => anyhow::bail!(
                "Profile name '{}' cannot name an instance directory",
                profile_name
            ),
        }
    }

    /// Stage `profile` into the target directory and wait for the loader.
    ///
    /// `profile_file` is the profile's persisted file; its age decides
    /// whether the instance directory can be reused.
    #[tracing::instrument(skip(self, profile, cancel), fields(profile = %profile.name))]
    pub async fn stage(
        &self,
        profile: &Profile,
        profile_file: &Path,
        cancel: &CancelToken,
    ) -> Result<StageReport> {
        let instance_dir = self.instance_dir(&profile.name)?;
        let mut report = StageReport::default();

        if self.runtime.exists(&instance_dir) && self.recently_written(profile_file) {
            info!("Re-entering {} from {:?}", profile.name, instance_dir);
            report.fast_path = true;
            report.placed = self.move_units(&instance_dir, &self.config.target_dir)?;
        } else {
            if self.runtime.exists(&instance_dir) {
                debug!("Discarding stale instance directory {:?}", instance_dir);
                self.runtime.remove_dir_all(&instance_dir)?;
            }
            let copied = self.place_entries(profile)?;
            report.placed = copied.touched;
            report.skipped = copied.skipped;
        }

        let sentinel = self.config.layout.sentinel(&self.config.target_dir);
        self.config
            .wait
            .wait(self.runtime, &sentinel, cancel)
            .await?;

        let scrubbed = remove_matching_files(
            self.runtime,
            &self.config.layout.loader_root(&self.config.target_dir),
            &self.config.layout.metadata_files,
        );
        for conflict in &scrubbed.conflicts {
            warn!("Could not scrub {}", conflict);
        }
        report.scrubbed = scrubbed.touched;
        report.conflicts = scrubbed.conflicts;

        info!(
            "Staged {} ({} file(s), fast path: {})",
            profile.name,
            report.placed.len(),
            report.fast_path
        );
        Ok(report)
    }

    fn recently_written(&self, profile_file: &Path) -> bool {
        let Ok(modified) = self.runtime.modified(profile_file) else {
            return false;
        };
        self.runtime
            .now()
            .duration_since(modified)
            .is_ok_and(|age| age < FAST_PATH_WINDOW)
    }

    /// Copy every entry's selected version into the target, continuing past
    /// per-file failures and reporting them together.
    fn place_entries(&self, profile: &Profile) -> Result<TreeReport> {
        for entry in &profile.entries {
            if !self.runtime.is_dir(&entry.source_dir()) {
                return Err(ModError::PackageNotFound {
                    name: format!("{} {}", entry.name, entry.selected_version),
                }
                .into());
            }
        }

        let layout = &self.config.layout;
        let target = &self.config.target_dir;
        let mut report = TreeReport::default();

        for entry in &profile.entries {
            let source = entry.source_dir();
            let placement = Placement::infer(self.runtime, layout, &entry.name, &source)?;
            let (from, into) = placement.paths(layout, &entry.name, &source, target);
            debug!("Placing {} ({:?}) into {:?}", entry.name, placement, into);

            if into == *target {
                report.merge(self.copy_onto_root(&from, target)?);
            } else {
                report.merge(copy_tree(self.runtime, &from, &into, ExistingPolicy::Skip));
            }
        }

        if !report.conflicts.is_empty() {
            return Err(ModError::FilesystemConflict {
                conflicts: report.conflicts,
            }
            .into());
        }
        Ok(report)
    }

    /// Like [`copy_tree`], but leaves top-level packaging files behind so the
    /// target root only gains runtime files.
    fn copy_onto_root(&self, from: &Path, target: &Path) -> Result<TreeReport> {
        let mut report = TreeReport::default();
        for child in self.runtime.read_dir(from)? {
            let Some(name) = child.file_name() else {
                continue;
            };
            if name
                .to_str()
                .is_some_and(|n| self.config.layout.is_metadata_file(n))
            {
                continue;
            }
            report.merge(copy_tree(
                self.runtime,
                &child,
                &target.join(name),
                ExistingPolicy::Skip,
            ));
        }
        Ok(report)
    }

    /// Move the loader directory and injector files out of the target and
    /// into the profile's instance directory.
    #[tracing::instrument(skip(self, profile), fields(profile = %profile.name))]
    pub fn unstage(&self, profile: &Profile) -> Result<UnstageReport> {
        let instance_dir = self.instance_dir(&profile.name)?;
        self.runtime.create_dir_all(&instance_dir)?;

        let moved = self.move_units(&self.config.target_dir, &instance_dir)?;
        info!(
            "Unstaged {}: {} item(s) moved to {:?}",
            profile.name,
            moved.len(),
            instance_dir
        );
        Ok(UnstageReport { moved })
    }

    /// Move each staged unit present in `from` to `to`, attempting all of
    /// them before reporting failures.
    fn move_units(&self, from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
        let mut moved = Vec::new();
        let mut conflicts = Vec::new();

        for unit in self.config.layout.staged_units() {
            let source = from.join(unit);
            if !self.runtime.exists(&source) {
                continue;
            }
            let dest = to.join(unit);
            match move_path(self.runtime, &source, &dest) {
                Ok(()) => moved.push(dest),
                Err(e) => match classify(&e) {
                    Some(ModError::FilesystemConflict { conflicts: inner }) => {
                        conflicts.extend(inner.iter().cloned())
                    }
                    _ => conflicts.push(FileConflict {
                        path: source,
                        reason: format!("{:#}", e),
                    }),
                },
            }
        }

        if !conflicts.is_empty() {
            return Err(ModError::FilesystemConflict { conflicts }.into());
        }
        Ok(moved)
    }
}
