//! Storage backend trait and implementations.
//!
//! The `StorageBackend` trait is the seam between the block map store, the
//! crawl snapshot writer and wherever their files actually live. Only the
//! local filesystem is implemented; object storage sync is handled outside
//! this workspace by moving the written files as opaque blobs.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use blockmap_storage::{backend::StorageBackend, error::Result};
///
/// async fn manifest_size(backend: &dyn StorageBackend) -> Result<usize> {
///     let path = Path::new("block_maps/index.json");
///     Ok(backend.read_optional(path).await?.map(|data| data.len()).unwrap_or(0))
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read file contents, mapping a missing file to `None`.
    ///
    /// Every other error (permissions, invalid path, I/O) is still returned.
    async fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write file contents, replacing any existing file.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}
