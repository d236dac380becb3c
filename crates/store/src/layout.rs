use std::path::{Path, PathBuf};

/// Where each persisted file lives, relative to the storage backend root.
///
/// Passed in explicitly at construction; nothing is derived from the process
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Single global block map (legacy mode).
    pub legacy_map: PathBuf,
    /// Directory holding shard files and the manifest (sharded mode).
    pub shard_dir: PathBuf,
    /// Manifest file name inside `shard_dir`.
    pub manifest_name: String,
    /// Append-only failure log.
    pub failure_log: PathBuf,
    /// Page URL to block script URLs sidecar.
    pub source_files: PathBuf,
}
impl StoreLayout {
    pub fn manifest(&self) -> PathBuf {
        self.shard_dir.join(&self.manifest_name)
    }

    pub fn shard(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.shard_dir.join(filename)
    }
}
impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            legacy_map: PathBuf::from("qa/block_map.json"),
            shard_dir: PathBuf::from("block_maps"),
            manifest_name: "index.json".to_string(),
            failure_log: PathBuf::from("qa/failed_urls.json"),
            source_files: PathBuf::from("qa/source_files.json"),
        }
    }
}
