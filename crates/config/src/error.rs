//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are retryable: the configuration has to be fixed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A value is out of range or the layers could not be combined.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// A configuration file could not be read.
    #[display("could not read {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
    /// A configuration file is not valid JSON of the expected shape.
    #[display("malformed configuration file {}", _0.display())]
    Malformed(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
