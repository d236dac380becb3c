//! Keyword search across every shard listed in a manifest.
//!
//! [`search`] validates a [`SearchRequest`], narrows the manifest by locale,
//! loads each shard from a [`ShardSource`] and runs [`search_shard`] over it.
//! Shards come either from the remote [`CachingClient`](blockmap_fetch::CachingClient)
//! or straight from disk through [`LocalShardSource`].

pub mod error;
mod facade;
mod locale;
mod request;
mod source;

pub use crate::facade::{search, search_shard};
pub use crate::locale::{DEFAULT_LOCALE, classify_locale, filter_by_locales};
pub use crate::request::{
    DEFAULT_COMBO_LIMIT, DEFAULT_SIMILARITY_THRESHOLD, MAX_COMBO_LIMIT, Query, SearchRequest, SearchResponse,
    ShardResult,
};
pub use crate::source::{LocalShardSource, ShardSource};
