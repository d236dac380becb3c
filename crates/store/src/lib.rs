//! Persistence for everything a crawl run produces.
//!
//! Two block map layouts are supported: a single global file (legacy) and one
//! shard file per origin label plus a manifest (sharded). Both merge the run
//! into what is already on disk using [`BlockMap::merge`](blockmap_extract::BlockMap::merge).

pub mod error;
mod failures;
mod layout;
mod sources;
mod store;

pub use crate::failures::FailureRecord;
pub use crate::layout::StoreLayout;
pub use crate::sources::SourceFiles;
pub use crate::store::{BlockMapStore, ShardReport, shard_filename};
