//! Read-merge-rewrite persistence of block maps.

use blockmap_extract::{BlockMap, ShardIndex};
use blockmap_storage::BackendHandle;
use exn::ResultExt;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::layout::StoreLayout;

/// Hex characters of the label digest used in shard file names.
const SHARD_ID_LEN: usize = 12;

/// Deterministic shard file name for an origin label.
///
/// ```
/// use blockmap_store::shard_filename;
///
/// assert_eq!(shard_filename("manual entries"), "block-map-9484252351b6.json");
/// ```
pub fn shard_filename(label: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(label.as_bytes()));
    format!("block-map-{}.json", &digest[..SHARD_ID_LEN])
}

/// Outcome of a sharded write. Individual shard failures do not abort the
/// write, they are listed here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardReport {
    /// Shard file names written, in label order.
    pub written: Vec<String>,
    /// Labels whose shard could not be merged or written.
    pub failed: Vec<String>,
    /// Labels skipped because their run map was empty.
    pub skipped: Vec<String>,
}

/// Single writer for everything persisted at the end of a crawl run.
///
/// Every operation reads the current file, merges, and rewrites it whole.
/// There is no locking; concurrent writers are not supported.
#[derive(Clone)]
pub struct BlockMapStore {
    backend: BackendHandle,
    layout: StoreLayout,
}
impl BlockMapStore {
    pub fn new(backend: BackendHandle, layout: StoreLayout) -> Self {
        Self { backend, layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let bytes = self.backend.read_optional(path).await.or_raise(|| ErrorKind::Storage(path.to_path_buf()))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).or_raise(|| ErrorKind::Malformed(path.to_path_buf())),
            None => Ok(None),
        }
    }

    pub(crate) async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).or_raise(|| ErrorKind::Encode(path.to_path_buf()))?;
        self.backend.write(path, &bytes).await.or_raise(|| ErrorKind::Storage(path.to_path_buf()))?;
        tracing::debug!(backend = self.backend.name(), path = %path.display(), bytes = bytes.len(), "rewrote store file");
        Ok(())
    }

    /// Loads the global block map; a missing file is an empty map.
    pub async fn load_legacy(&self) -> Result<BlockMap> {
        Ok(self.read_json(&self.layout.legacy_map).await?.unwrap_or_default())
    }

    /// Merges one run into the global block map and rewrites it.
    ///
    /// Returns the merged map. A malformed existing file is an error and is
    /// not overwritten.
    #[instrument(skip(self, run), fields(run_entries = run.len()))]
    pub async fn merge_legacy(&self, run: BlockMap) -> Result<BlockMap> {
        let mut persisted = self.load_legacy().await?;
        let before = persisted.len();
        persisted.merge(run);
        self.write_json(&self.layout.legacy_map, &persisted).await?;
        tracing::info!(
            path = %self.layout.legacy_map.display(),
            entries = persisted.len(),
            added = persisted.len() - before,
            "merged block map"
        );
        Ok(persisted)
    }

    /// Loads the shard manifest.
    ///
    /// Missing or malformed manifests read as empty so the next sharded write
    /// regenerates them. Storage failures are still errors.
    pub async fn load_manifest(&self) -> Result<ShardIndex> {
        let path = self.layout.manifest();
        match self.read_json::<ShardIndex>(&path).await {
            Ok(manifest) => Ok(manifest.unwrap_or_default()),
            Err(err) if matches!(&*err, ErrorKind::Malformed(_)) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed shard manifest; regenerating");
                Ok(ShardIndex::new())
            },
            Err(err) => Err(err),
        }
    }

    /// Loads one shard by file name; a missing shard is an empty map.
    pub async fn load_shard(&self, filename: &str) -> Result<BlockMap> {
        Ok(self.read_json(&self.layout.shard(filename)).await?.unwrap_or_default())
    }

    /// Merges per-label run maps into their shard files and updates the
    /// manifest.
    ///
    /// Empty run maps are skipped. A shard that cannot be read, merged or
    /// written is logged and reported, and the remaining shards and the
    /// manifest still proceed. The manifest is merged into, never replaced.
    #[instrument(skip(self, runs), fields(labels = runs.len()))]
    pub async fn write_shards(&self, runs: IndexMap<String, BlockMap>) -> Result<ShardReport> {
        let mut report = ShardReport::default();
        let mut manifest_updates = ShardIndex::new();
        for (label, run) in runs {
            if run.is_empty() {
                tracing::debug!(label = %label, "empty block map for label; skipping shard");
                report.skipped.push(label);
                continue;
            }
            let filename = shard_filename(&label);
            match self.merge_shard(&filename, run).await {
                Ok(entries) => {
                    tracing::info!(label = %label, shard = %filename, entries, "wrote shard");
                    manifest_updates.insert(filename.clone(), label);
                    report.written.push(filename);
                },
                Err(err) => {
                    tracing::error!(label = %label, shard = %filename, error = ?err, "failed to write shard");
                    report.failed.push(label);
                },
            }
        }

        if !manifest_updates.is_empty() {
            let mut manifest = self.load_manifest().await?;
            manifest.extend(manifest_updates);
            self.write_json(&self.layout.manifest(), &manifest).await?;
            tracing::info!(path = %self.layout.manifest().display(), shards = manifest.len(), "updated shard manifest");
        }
        Ok(report)
    }

    async fn merge_shard(&self, filename: &str, run: BlockMap) -> Result<usize> {
        let path = self.layout.shard(filename);
        let mut shard: BlockMap = self.read_json(&path).await?.unwrap_or_default();
        shard.merge(run);
        self.write_json(&path, &shard).await?;
        Ok(shard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmap_storage::backend::MockBackend;
    use std::sync::Arc;

    fn map(json: &str) -> BlockMap {
        serde_json::from_str(json).unwrap()
    }

    fn store(backend: MockBackend) -> (Arc<MockBackend>, BlockMapStore) {
        let backend = Arc::new(backend);
        (backend.clone(), BlockMapStore::new(backend, StoreLayout::default()))
    }

    #[test]
    fn test_shard_filename() {
        assert_eq!(shard_filename("https://www.adobe.com/express/sitemap.xml"), "block-map-4c1ba3e0ec14.json");
        assert_ne!(shard_filename("a"), shard_filename("b"));
    }

    #[tokio::test]
    async fn test_merge_legacy_into_missing_file() {
        let (backend, store) = store(MockBackend::default());
        let run = map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#);
        store.merge_legacy(run.clone()).await.unwrap();
        let written: BlockMap = serde_json::from_str(&backend.contents("qa/block_map.json").await.unwrap()).unwrap();
        assert_eq!(written, run);
    }

    #[tokio::test]
    async fn test_merge_legacy_rule() {
        let (backend, store) =
            store(MockBackend::with_files([("qa/block_map.json", r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#)]));
        let merged = store.merge_legacy(map(r#"{"h1":{"class_names":["a","b"],"urls":["u2"]}}"#)).await.unwrap();
        let expected = map(r#"{"h1":{"class_names":["a","b"],"urls":["u1","u2"]}}"#);
        assert_eq!(merged, expected);
        let written: BlockMap = serde_json::from_str(&backend.contents("qa/block_map.json").await.unwrap()).unwrap();
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn test_merge_legacy_refuses_malformed() {
        let (backend, store) = store(MockBackend::with_files([("qa/block_map.json", "[1, 2")]));
        let err = store.merge_legacy(BlockMap::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_pretty_printed() {
        let (backend, store) = store(MockBackend::default());
        store.merge_legacy(map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#)).await.unwrap();
        let contents = backend.contents("qa/block_map.json").await.unwrap();
        assert!(contents.starts_with("{\n  \"h1\": {\n    \"class_names\": ["));
    }

    #[tokio::test]
    async fn test_malformed_manifest_reads_empty() {
        let (_, store) = store(MockBackend::with_files([("block_maps/index.json", "not json")]));
        assert!(store.load_manifest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_shards() {
        let existing = shard_filename("sitemap-a");
        let (backend, store) = store(MockBackend::with_files([
            ("block_maps/index.json".to_string(), r#"{"block-map-old.json":"old-label"}"#.to_string()),
            (format!("block_maps/{existing}"), r#"{"h1":{"class_names":["a"],"urls":["u0"]}}"#.to_string()),
        ]));
        let mut runs = IndexMap::new();
        runs.insert("sitemap-a".to_string(), map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#));
        runs.insert("manual entries".to_string(), map(r#"{"h2":{"class_names":["b"],"urls":["u2"]}}"#));
        runs.insert("empty".to_string(), BlockMap::new());

        let report = store.write_shards(runs).await.unwrap();
        assert_eq!(report.written, [existing.clone(), shard_filename("manual entries")]);
        assert_eq!(report.skipped, ["empty"]);
        assert!(report.failed.is_empty());

        let manifest = store.load_manifest().await.unwrap();
        assert_eq!(manifest.get("block-map-old.json").map(String::as_str), Some("old-label"));
        assert_eq!(manifest.get(&existing).map(String::as_str), Some("sitemap-a"));
        assert_eq!(manifest.len(), 3);

        let shard = store.load_shard(&existing).await.unwrap();
        assert_eq!(shard, map(r#"{"h1":{"class_names":["a"],"urls":["u0","u1"]}}"#));
        assert!(backend.contents(format!("block_maps/{}", shard_filename("empty"))).await.is_none());
    }

    #[tokio::test]
    async fn test_write_shards_isolates_failures() {
        let broken = shard_filename("broken");
        let (_, store) = store(MockBackend::default().failing_writes_to(format!("block_maps/{broken}")));
        let mut runs = IndexMap::new();
        runs.insert("broken".to_string(), map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#));
        runs.insert("fine".to_string(), map(r#"{"h2":{"class_names":["b"],"urls":["u2"]}}"#));

        let report = store.write_shards(runs).await.unwrap();
        assert_eq!(report.failed, ["broken"]);
        assert_eq!(report.written, [shard_filename("fine")]);
        let manifest = store.load_manifest().await.unwrap();
        assert_eq!(manifest.keys().collect::<Vec<_>>(), [&shard_filename("fine")]);
    }
}
