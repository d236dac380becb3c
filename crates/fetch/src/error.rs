//! Fetch Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status reported when the upstream answered with something unusable.
const BAD_GATEWAY: u16 = 502;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// None of them ever replace a cached value.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was invalid (blank shard name, no base URL).
    #[display("invalid request: {_0}")]
    Usage(#[error(not(source))] String),
    /// The origin answered with a non-2xx status.
    #[display("upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },
    /// The origin answered 2xx but the body was not the expected JSON shape.
    #[display("malformed payload from {_0}")]
    Malformed(#[error(not(source))] String),
    /// Connection, TLS or timeout failure.
    #[display("network error fetching {_0}")]
    Network(#[error(not(source))] String),
    /// The client was closed.
    #[display("client closed")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status a service layer should answer with.
    ///
    /// Upstream failures carry the upstream status through; unusable payloads
    /// and unreachable origins are a bad gateway.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Usage(_) => 400,
            Self::Upstream { status, .. } => *status,
            Self::Malformed(_) | Self::Network(_) => BAD_GATEWAY,
            Self::Closed => 503,
        }
    }
}
