//! DOM snapshot capture and block signature extraction.

use async_trait::async_trait;
use blockmap_extract::{BlockMap, extract, is_block_script};
use blockmap_storage::{BackendHandle, snapshot_filename};
use blockmap_store::{BlockMapStore, SourceFiles};
use exn::ResultExt;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::instrument;

use crate::driver::{Environment, PageEvent};
use crate::error::{ErrorKind, Result};
use crate::plan::MANUAL_FALLBACK_LABEL;
use crate::role::PageRole;

/// Where extracted signatures are merged at the end of a group.
#[derive(Debug, Clone)]
pub enum BlockMapOutput {
    /// Everything into the single global block map.
    Legacy,
    /// One shard per origin label; pages missing from `origins` fall back to
    /// the manual entries label.
    Sharded { origins: IndexMap<String, String> },
}

/// Captures each page's DOM to a snapshot file, records block script
/// requests, and turns the snapshots into block maps on finalize.
///
/// Snapshot writes run on a small pool of background tasks so capture never
/// waits on disk. Finalize drains that pool before reading any snapshot back.
pub struct SourceCaptureRole {
    backend: BackendHandle,
    store: BlockMapStore,
    snapshot_dir: PathBuf,
    output: BlockMapOutput,
    writers: Arc<Semaphore>,
    pending: AsyncMutex<JoinSet<()>>,
    sources: Mutex<SourceFiles>,
}
impl SourceCaptureRole {
    pub fn new(
        backend: BackendHandle,
        store: BlockMapStore,
        snapshot_dir: impl Into<PathBuf>,
        output: BlockMapOutput,
        writer_workers: usize,
    ) -> Self {
        Self {
            backend,
            store,
            snapshot_dir: snapshot_dir.into(),
            output,
            writers: Arc::new(Semaphore::new(writer_workers.max(1))),
            pending: AsyncMutex::new(JoinSet::new()),
            sources: Mutex::new(SourceFiles::new()),
        }
    }

    fn snapshot_path(&self, url: &str) -> PathBuf {
        self.snapshot_dir.join(snapshot_filename(url))
    }

    async fn queue_snapshot(&self, url: &str, html: String) {
        let backend = self.backend.clone();
        let writers = self.writers.clone();
        let path = self.snapshot_path(url);
        let url = url.to_string();
        self.pending.lock().await.spawn(async move {
            let Ok(_permit) = writers.acquire_owned().await else {
                return;
            };
            match backend.write(&path, html.as_bytes()).await {
                Ok(()) => tracing::debug!(url = %url, path = %path.display(), "saved DOM snapshot"),
                Err(err) => tracing::error!(url = %url, path = %path.display(), error = ?err, "failed to save DOM snapshot"),
            }
        });
    }

    /// Waits for every queued snapshot write.
    async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "snapshot writer task failed");
            }
        }
    }

    /// Block map fragment of one page's snapshot, or `None` if the snapshot
    /// is missing or has no main container.
    async fn extract_snapshot(&self, url: &str) -> Option<BlockMap> {
        let path = self.snapshot_path(url);
        let bytes = match self.backend.read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(url, path = %path.display(), error = %err, "snapshot unavailable; skipping page");
                return None;
            },
        };
        match extract(&String::from_utf8_lossy(&bytes), url) {
            Ok(fragment) => Some(fragment),
            Err(err) => {
                tracing::warn!(url, path = %path.display(), error = %err, "no blocks extracted; skipping page");
                None
            },
        }
    }
}

#[async_trait]
impl PageRole for SourceCaptureRole {
    async fn on_page_init(&self, url: &str, _environment: Environment) -> Result<()> {
        self.sources.lock().unwrap_or_else(|p| p.into_inner()).insert(url.to_string(), Default::default());
        Ok(())
    }

    async fn on_page_event(&self, url: &str, _environment: Environment, event: &PageEvent) -> Result<()> {
        match event {
            PageEvent::Response { url: requested } if is_block_script(requested) => {
                let mut sources = self.sources.lock().unwrap_or_else(|p| p.into_inner());
                sources.entry(url.to_string()).or_default().insert(requested.clone());
            },
            PageEvent::Response { .. } => {},
            PageEvent::Content { html } => self.queue_snapshot(url, html.clone()).await,
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn finalize(&self) -> Result<()> {
        self.drain().await;
        let sources = std::mem::take(&mut *self.sources.lock().unwrap_or_else(|p| p.into_inner()));

        let mut legacy = BlockMap::new();
        let mut labelled: IndexMap<String, BlockMap> = IndexMap::new();
        for page in sources.keys() {
            let Some(fragment) = self.extract_snapshot(page).await else {
                continue;
            };
            match &self.output {
                BlockMapOutput::Legacy => legacy.absorb(fragment),
                BlockMapOutput::Sharded { origins } => {
                    let label = origins.get(page).map_or(MANUAL_FALLBACK_LABEL, String::as_str);
                    labelled.entry(label.to_string()).or_default().absorb(fragment);
                },
            }
        }

        let pages = sources.len();
        self.store.merge_source_files(sources).await.or_raise(|| ErrorKind::Store("source files".into()))?;
        tracing::info!(pages, "merged source files");

        match &self.output {
            BlockMapOutput::Legacy => {
                self.store.merge_legacy(legacy).await.or_raise(|| ErrorKind::Store("block map".into()))?;
            },
            BlockMapOutput::Sharded { .. } => {
                let report = self.store.write_shards(labelled).await.or_raise(|| ErrorKind::Store("block map shards".into()))?;
                if !report.failed.is_empty() {
                    tracing::warn!(failed = ?report.failed, "some shards were not written");
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmap_storage::backend::MockBackend;
    use blockmap_store::StoreLayout;

    const PAGE: &str = r#"<html><body><main>
        <div class="section"><div class="hero centered"></div></div>
    </main></body></html>"#;

    fn role(backend: Arc<MockBackend>, output: BlockMapOutput) -> SourceCaptureRole {
        let store = BlockMapStore::new(backend.clone(), StoreLayout::default());
        SourceCaptureRole::new(backend, store, "qa/dom_snapshots", output, 2)
    }

    async fn capture(role: &SourceCaptureRole, url: &str, html: &str, scripts: &[&str]) {
        role.on_page_init(url, Environment::Control).await.unwrap();
        for script in scripts {
            let event = PageEvent::Response { url: script.to_string() };
            role.on_page_event(url, Environment::Control, &event).await.unwrap();
        }
        let event = PageEvent::Content { html: html.to_string() };
        role.on_page_event(url, Environment::Control, &event).await.unwrap();
    }

    #[tokio::test]
    async fn test_legacy_capture() {
        let backend = Arc::new(MockBackend::default());
        let role = role(backend.clone(), BlockMapOutput::Legacy);
        capture(
            &role,
            "https://ctl.page/express/",
            PAGE,
            &["https://ctl.page/express/code/blocks/hero/hero.js", "https://ctl.page/scripts/scripts.js"],
        )
        .await;
        capture(&role, "https://ctl.page/express/empty", "<html><body></body></html>", &[]).await;
        role.finalize().await.unwrap();

        assert!(backend.contents("qa/dom_snapshots/https_ctl.page_express_.html").await.is_some());
        let map: BlockMap = serde_json::from_str(&backend.contents("qa/block_map.json").await.unwrap()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.urls().collect::<Vec<_>>(), ["https://ctl.page/express/"]);

        let sources: serde_json::Value =
            serde_json::from_str(&backend.contents("qa/source_files.json").await.unwrap()).unwrap();
        assert_eq!(
            sources,
            serde_json::json!({
                "https://ctl.page/express/": ["https://ctl.page/express/code/blocks/hero/hero.js"],
                "https://ctl.page/express/empty": [],
            })
        );
    }

    #[tokio::test]
    async fn test_sharded_capture() {
        let backend = Arc::new(MockBackend::default());
        let origins = IndexMap::from([("https://ctl.page/express/".to_string(), "https://www.adobe.com/express/sitemap.xml".to_string())]);
        let role = role(backend.clone(), BlockMapOutput::Sharded { origins });
        capture(&role, "https://ctl.page/express/", PAGE, &[]).await;
        capture(&role, "https://ctl.page/express/other", PAGE, &[]).await;
        role.finalize().await.unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&backend.contents("block_maps/index.json").await.unwrap()).unwrap();
        assert_eq!(
            manifest,
            serde_json::json!({
                "block-map-4c1ba3e0ec14.json": "https://www.adobe.com/express/sitemap.xml",
                "block-map-9484252351b6.json": "manual entries",
            })
        );
        assert!(backend.contents("qa/block_map.json").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_skips_page() {
        let backend = Arc::new(
            MockBackend::default().failing_writes_to("qa/dom_snapshots/https_ctl.page_express_.html"),
        );
        let role = role(backend.clone(), BlockMapOutput::Legacy);
        capture(&role, "https://ctl.page/express/", PAGE, &[]).await;
        role.finalize().await.unwrap();
        assert_eq!(backend.contents("qa/block_map.json").await.as_deref(), Some("{}"));
    }
}
