//! Staging profiles into the target application's directory.

mod layout;
mod placement;
mod sentinel;
mod stage;

pub use layout::LoaderLayout;
pub use placement::Placement;
pub use sentinel::{CancelToken, DEFAULT_POLL_INTERVAL, DEFAULT_SENTINEL_TIMEOUT, SentinelWait};
pub use stage::{Deployer, DeployerConfig, FAST_PATH_WINDOW, StageReport, UnstageReport};
