//! Product catalog: live store and the listing pipeline.
pub mod pipeline;
pub mod store;

pub use pipeline::{admin_filter, derive, ListingQuery, SortKey, ALL_CATEGORIES};
pub use store::{CatalogFeed, CatalogStore, CatalogUpdate};
