//! Where shards come from.

use async_trait::async_trait;
use blockmap_extract::{BlockMap, ShardIndex};
use blockmap_fetch::{CachingClient, validate_shard_name};
use blockmap_store::BlockMapStore;
use exn::ResultExt;
use std::sync::Arc;

use crate::error::{ErrorKind, Result};

/// A manifest of shards plus a way to load each one.
#[async_trait]
pub trait ShardSource: Send + Sync {
    async fn manifest(&self) -> Result<Arc<ShardIndex>>;

    async fn shard(&self, filename: &str) -> Result<Arc<BlockMap>>;
}

#[async_trait]
impl ShardSource for CachingClient {
    async fn manifest(&self) -> Result<Arc<ShardIndex>> {
        match CachingClient::manifest(self).await {
            Ok(manifest) => Ok(manifest),
            Err(err) => {
                let kind = ErrorKind::from_fetch(&err);
                Err(err).or_raise(|| kind)
            },
        }
    }

    async fn shard(&self, filename: &str) -> Result<Arc<BlockMap>> {
        match CachingClient::shard(self, filename).await {
            Ok(shard) => Ok(shard),
            Err(err) => {
                let kind = ErrorKind::from_fetch(&err);
                Err(err).or_raise(|| kind)
            },
        }
    }
}

/// Reads the manifest and shards straight from a store's shard directory.
///
/// A missing manifest or shard reads as empty, so a partially synced
/// directory simply yields fewer results.
pub struct LocalShardSource {
    store: BlockMapStore,
}
impl LocalShardSource {
    pub fn new(store: BlockMapStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ShardSource for LocalShardSource {
    async fn manifest(&self) -> Result<Arc<ShardIndex>> {
        match self.store.load_manifest().await {
            Ok(manifest) => Ok(Arc::new(manifest)),
            Err(err) => {
                let kind = ErrorKind::from_store(&err);
                Err(err).or_raise(|| kind)
            },
        }
    }

    async fn shard(&self, filename: &str) -> Result<Arc<BlockMap>> {
        let filename = match validate_shard_name(filename) {
            Ok(filename) => filename,
            Err(err) => {
                let kind = ErrorKind::from_fetch(&err);
                return Err(err).or_raise(|| kind);
            },
        };
        match self.store.load_shard(filename).await {
            Ok(shard) => Ok(Arc::new(shard)),
            Err(err) => {
                let kind = ErrorKind::from_store(&err);
                Err(err).or_raise(|| kind)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmap_storage::backend::MockBackend;
    use blockmap_store::StoreLayout;
    use rstest::rstest;

    fn source() -> LocalShardSource {
        let backend = Arc::new(MockBackend::with_files([
            ("block_maps/index.json", r#"{"x.json": "label"}"#),
            ("block_maps/x.json", r#"{"h1": {"class_names": ["hero"]}}"#),
        ]));
        LocalShardSource::new(BlockMapStore::new(backend, StoreLayout::default()))
    }

    #[tokio::test]
    async fn test_local_shard() {
        let shard = source().shard(" x.json ").await.unwrap();
        assert!(shard.get("h1").unwrap().urls.is_empty());
        assert!(source().shard("missing.json").await.unwrap().is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("../x.json")]
    #[case("x.json?raw")]
    #[case("c:x.json")]
    #[tokio::test]
    async fn test_invalid_local_shard_name(#[case] name: &str) {
        let err = source().shard(name).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Usage(_)));
    }
}
