//! Remote package catalog.

mod cache;
mod types;

pub use cache::{CACHE_TTL, Listings, RemoteCatalog};
pub use types::{RemoteListing, RemoteVersion};
