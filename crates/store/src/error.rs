//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The backing storage failed; see the child error.
    #[display("storage failure for {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
    /// A persisted file exists but is not the expected JSON shape. The file is
    /// left untouched.
    #[display("malformed data in {}", _0.display())]
    Malformed(#[error(not(source))] PathBuf),
    /// Data could not be serialized for writing.
    #[display("could not encode {}", _0.display())]
    Encode(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
