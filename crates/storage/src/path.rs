//! Storage key validation.
//!
//! Every file a backend touches (block maps, shard files, snapshots, sidecars)
//! is addressed by a path relative to the backend root. Keys are normalized
//! here and anything that could leave the root is refused.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a storage key, refusing keys that would escape the root.
///
/// `.` components and repeated separators are dropped, `..` pops the previous
/// component. Null bytes and platform prefixes are rejected, as is any key
/// that normalizes to nothing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use blockmap_storage::validate_path;
///
/// assert_eq!(
///     validate_path("block_maps/./block-map-0123456789ab.json").unwrap(),
///     Path::new("block_maps/block-map-0123456789ab.json"),
/// );
/// assert!(validate_path("../block_map.json").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let reject = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));

    let mut kept: Vec<&OsStr> = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => return Err(reject()),
            Component::Normal(segment) => kept.push(segment),
            Component::ParentDir => {
                kept.pop().ok_or_else(reject)?;
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(reject()),
        }
    }
    if kept.is_empty() {
        return Err(reject());
    }
    Ok(kept.into_iter().collect())
}
