pub mod backend;
pub mod error;
mod path;
mod snapshot;

pub use crate::backend::StorageBackend;
pub use crate::path::validate as validate_path;
pub use crate::snapshot::snapshot_filename;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
