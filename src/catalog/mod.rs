//! Partition catalog
//!
//! A locally cached copy of the partition definitions published by the
//! cluster operators:
//! - `partition`: the `Partition` model and the `Catalog` collection
//! - `source`: where a fresh catalog comes from (HTTP)
//! - `store`: where the cached copy lives (files, or memory in tests)
//! - `cache`: the TTL policy tying the two together

mod cache;
mod partition;
mod source;
mod store;

pub use cache::{CatalogCache, Clock, SystemClock};
pub use partition::{Catalog, GpuResource, Partition};
pub use source::{CatalogSource, HttpCatalogSource};
pub use store::{CatalogStore, FsCatalogStore, MemoryCatalogStore, StoredCatalog, PAYLOAD_FILE, TIMESTAMP_FILE};
