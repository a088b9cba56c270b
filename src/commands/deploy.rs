use anyhow::Result;
use log::warn;
use std::time::Duration;

use crate::deploy::{CancelToken, Deployer};
use crate::profile::ProfileStore;
use crate::runtime::Runtime;

use super::config::Config;
use super::profile::load_resolved;

/// Stage a profile into the target directory. Ctrl-C aborts the wait for
/// the loader.
#[tracing::instrument(skip(runtime, config))]
pub async fn stage<R: Runtime>(
    runtime: &R,
    config: &Config,
    name: &str,
    timeout: Option<u64>,
) -> Result<()> {
    let mut deployer_config = config.deployer_config()?;
    if let Some(secs) = timeout {
        deployer_config.wait.timeout = Duration::from_secs(secs);
    }
    let deployer = Deployer::new(runtime, deployer_config);
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let profile = load_resolved(runtime, config, name)?;

    for entry in profile.entries.iter().filter(|e| e.has_incompatibility()) {
        warn!(
            "{} has unresolved dependencies: {}",
            entry.name,
            entry
                .missing_dependencies
                .iter()
                .chain(&entry.mismatched_dependencies)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = deployer
        .stage(&profile, &profiles.profile_path(name), &cancel)
        .await;
    ctrl_c.abort();
    let report = result?;

    for conflict in &report.conflicts {
        eprintln!("Could not remove {}", conflict);
    }
    println!(
        "Staged {} into {} ({})",
        profile.name,
        deployer.target_dir().display(),
        if report.fast_path {
            "reused instance".to_string()
        } else {
            format!("{} file(s) copied", report.placed.len())
        }
    );
    Ok(())
}

/// Move the loader state back into the profile's instance directory.
///
/// The profile file is re-saved afterwards, so a `stage` shortly after
/// reuses the instance directory.
#[tracing::instrument(skip(runtime, config))]
pub fn unstage<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let deployer = Deployer::new(runtime, config.deployer_config()?);
    let profiles = ProfileStore::new(runtime, config.profile_root.clone());
    let profile = profiles.load(name)?;

    let report = deployer.unstage(&profile)?;
    profiles.save(&profile)?;

    println!(
        "Unstaged {}: {} item(s) moved to {}",
        profile.name,
        report.moved.len(),
        deployer.instance_dir(&profile.name)?.display()
    );
    Ok(())
}
