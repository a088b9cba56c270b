//! CLI command handlers.
//!
//! Each handler builds the core components it needs from [`Config`], calls
//! into them and prints the result.

pub mod catalog;
pub mod config;
pub mod deploy;
mod paths;
pub mod profile;
pub mod store;

pub use config::{Config, ConfigOverrides};
pub use paths::{default_root, discover_target_dir};
