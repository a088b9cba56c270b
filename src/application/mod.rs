//! Application layer - Use cases that coordinate the core components.
//!
//! This layer sits between the CLI handlers and the store, catalog,
//! resolver and deployer.

mod fetch;

pub use fetch::{ConflictChoice, DependencyFetcher, FetchReport, PackageSource};

#[cfg(test)]
pub use fetch::MockPackageSource;
