//! Named profiles: ordered package selections persisted one file each.

mod model;
mod store;

pub use model::{ModEntry, Profile};
pub use store::{ProfileListing, ProfileStore};
