//! Crawl Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A crawl error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Only [`Config`](Self::Config) is fatal to a whole crawl. Everything else is
/// scoped to one page or one group of pages.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The page driver could not load a page.
    #[display("could not load {_0}")]
    Driver(#[error(not(source))] String),
    /// The page driver could not be set up.
    #[display("page driver unavailable")]
    DriverSetup,
    /// The crawl site configuration is unusable.
    #[display("unusable crawl configuration")]
    Config,
    /// Crawl results could not be persisted.
    #[display("could not persist crawl results for {_0}")]
    Store(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Driver(_) | Self::Store(_))
    }
}
