//! Search Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A search error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was invalid; nothing was searched.
    #[display("invalid search request: {_0}")]
    Usage(#[error(not(source))] String),
    /// The shard origin answered with a non-2xx status.
    #[display("upstream returned {status}")]
    Upstream { status: u16 },
    /// A manifest or shard could not be parsed.
    #[display("malformed block map data: {_0}")]
    Malformed(#[error(not(source))] String),
    /// The shard source could not be reached or read.
    #[display("shard source unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status } => *status >= 500,
            Self::Unavailable(_) => true,
            _ => false,
        }
    }

    /// HTTP status a service layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Usage(_) => 400,
            Self::Upstream { status } => *status,
            Self::Malformed(_) | Self::Unavailable(_) => 502,
        }
    }

    pub(crate) fn from_fetch(kind: &blockmap_fetch::error::ErrorKind) -> Self {
        use blockmap_fetch::error::ErrorKind as Fetch;
        match kind {
            Fetch::Usage(message) => Self::Usage(message.clone()),
            Fetch::Upstream { status, .. } => Self::Upstream { status: *status },
            Fetch::Malformed(url) => Self::Malformed(url.clone()),
            Fetch::Network(_) | Fetch::Closed => Self::Unavailable(kind.to_string()),
        }
    }

    pub(crate) fn from_store(kind: &blockmap_store::error::ErrorKind) -> Self {
        use blockmap_store::error::ErrorKind as Store;
        match kind {
            Store::Malformed(path) => Self::Malformed(path.display().to_string()),
            Store::Storage(_) | Store::Encode(_) => Self::Unavailable(kind.to_string()),
        }
    }
}
