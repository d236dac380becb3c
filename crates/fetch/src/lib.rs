//! Remote retrieval of the shard manifest and block map shards.
//!
//! [`CachingClient`] keeps each payload in memory for a fixed lifetime and
//! guarantees at most one in-flight request per payload. The network sits
//! behind the [`Transport`] trait so tests can script it.

mod cache;
mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod transport;

use std::time::Duration;

pub use crate::client::{CURRENT_PREFIX, CacheTtl, CachingClient, MANIFEST_NAME, resolve_base_url, validate_shard_name};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockTransport;
pub use crate::transport::{HttpTransport, Response, Transport};

/// Default timeout for a single request to the origin.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
