//! Every filesystem, environment and clock access the core makes.
//!
//! Components take `&R where R: Runtime` so tests can swap in `MockRuntime`
//! or drive [`RealRuntime`] against a temporary directory.
//!
//! - `env` - environment variables and well-known directories
//! - `fs` - file and directory primitives
//! - `tree` - recursive copy/move/scrub built on the primitives

mod env;
mod fs;
pub mod tree;

use anyhow::Result;
use async_trait::async_trait;
use std::env::VarError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use tree::{ExistingPolicy, copy_tree, move_path, remove_matching_files};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    fn env_var(&self, key: &str) -> Result<String, VarError>;
    fn home_dir(&self) -> Option<PathBuf>;
    /// Platform data directory, e.g. `~/.local/share` on Linux.
    fn data_dir(&self) -> Option<PathBuf>;

    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Immediate children of `path`, unsorted.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn Write + Send>>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;
    /// Fails across filesystems; see [`move_path`] for the fallback.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Unix mode bits; ignored elsewhere.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;
    fn modified(&self, path: &Path) -> Result<SystemTime>;
    fn now(&self) -> SystemTime;
}

/// [`Runtime`] backed by `std::fs`, `std::env` and `dirs`.
pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        std::env::var(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        env::home_dir()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        env::data_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::list_children(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::make_dirs(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_tree(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read_bytes(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_text(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write_bytes(path, contents)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::open_reader(path)?))
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(fs::create_writer(path)?))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy_file(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename_path(from, to)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_one(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_mode(path, mode)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        fs::last_write(path)
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
