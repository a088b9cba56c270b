use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// `<data dir>/modbay`
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let data_dir = runtime
        .data_dir()
        .or_else(|| runtime.home_dir().map(|home| home.join(".local").join("share")))
        .context("Could not find a data directory")?;
    Ok(data_dir.join("modbay"))
}

/// Well-known Steam library roots, before `libraryfolders.vdf` expansion.
/// `STEAM_DIR` comes first when set.
fn steam_roots<R: Runtime>(runtime: &R) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(dir) = runtime.env_var("STEAM_DIR") {
        roots.push(PathBuf::from(dir));
    }
    if let Some(home) = runtime.home_dir() {
        roots.push(home.join(".steam").join("steam"));
        roots.push(home.join(".local").join("share").join("Steam"));
        roots.push(
            home.join("Library")
                .join("Application Support")
                .join("Steam"),
        );
    }
    if cfg!(windows) {
        roots.push(PathBuf::from(r"C:\Program Files (x86)\Steam"));
        roots.push(PathBuf::from(r"C:\Program Files\Steam"));
    }
    roots
}

/// Extra library paths listed as `"path"  "<dir>"` lines.
fn library_folders<R: Runtime>(runtime: &R, steam_root: &Path) -> Vec<PathBuf> {
    let vdf = steam_root.join("steamapps").join("libraryfolders.vdf");
    let Ok(content) = runtime.read_to_string(&vdf) else {
        return vec![];
    };
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('"').collect();
            match parts.as_slice() {
                [_, "path", _, path, ..] => Some(PathBuf::from(path.replace("\\\\", "\\"))),
                _ => None,
            }
        })
        .collect()
}

/// Look for `steamapps/common/<game_dir_name>` in every known Steam library.
///
/// Meant to run once at startup; the result is handed to the deployer.
#[tracing::instrument(skip(runtime))]
pub fn discover_target_dir<R: Runtime>(runtime: &R, game_dir_name: &str) -> Option<PathBuf> {
    let mut libraries = Vec::new();
    for root in steam_roots(runtime) {
        if !runtime.is_dir(&root) {
            continue;
        }
        libraries.extend(library_folders(runtime, &root));
        libraries.push(root);
    }

    for library in libraries {
        let candidate = library.join("steamapps").join("common").join(game_dir_name);
        debug!("Checking {:?}", candidate);
        if runtime.is_dir(&candidate) {
            return Some(candidate);
        }
    }
    None
}
