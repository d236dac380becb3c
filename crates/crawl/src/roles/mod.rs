//! The page roles a crawl group runs with.

mod failure;
mod source;

pub use self::failure::FailureRole;
pub use self::source::{BlockMapOutput, SourceCaptureRole};

/// Role name of [`SourceCaptureRole`].
pub const SOURCE_ROLE: &str = "source";
/// Role name of [`FailureRole`].
pub const FAILURE_ROLE: &str = "failure";
