use async_stream::stream;
use blockmap_config::{CrawlConfig, PathsConfig};
use blockmap_query::ensure_martech_off;
use blockmap_storage::BackendHandle;
use blockmap_store::BlockMapStore;
use futures::Stream;
use futures::future::join_all;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::{Environment, PageDriver};
use crate::error::Result;
use crate::plan::{CrawlPlan, EnvironmentUrls};
use crate::role::{PageFailure, Roles};
use crate::roles::{BlockMapOutput, FAILURE_ROLE, FailureRole, SOURCE_ROLE, SourceCaptureRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Canonical URLs per batch. Each batch visits them on both hosts.
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub writer_workers: usize,
    /// Canonical URLs per group; `0` crawls them all.
    pub group_limit: usize,
    pub sharded: bool,
    pub snapshot_dir: PathBuf,
}
impl CrawlSettings {
    pub fn from_config(paths: &PathsConfig, crawl: &CrawlConfig) -> Self {
        Self {
            batch_size: crawl.batch_size.max(1),
            batch_pause: crawl.batch_pause(),
            writer_workers: crawl.writer_workers,
            group_limit: crawl.group_limit,
            sharded: crawl.sharded,
            snapshot_dir: paths.snapshot_dir.clone(),
        }
    }
}

/// Progress events emitted by [`Crawler::run`].
///
/// `Started` comes first and `Complete` last. Each crawled group emits
/// `GroupStarted`, one `BatchComplete` per batch, then `GroupFinished` once
/// its roles have persisted their results. Groups with no URLs emit nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    Started { groups: usize },
    GroupStarted { label: String, pages: usize },
    BatchComplete { label: String, batch: usize, batches: usize, succeeded: usize, failed: usize },
    GroupFinished { label: String, succeeded: usize, failed: usize },
    Complete,
}

/// Runs a [`CrawlPlan`] group by group.
pub struct Crawler {
    driver: Arc<dyn PageDriver>,
    backend: BackendHandle,
    store: BlockMapStore,
    settings: CrawlSettings,
}
impl Crawler {
    pub fn new(driver: Arc<dyn PageDriver>, backend: BackendHandle, store: BlockMapStore, settings: CrawlSettings) -> Self {
        Self { driver, backend, store, settings }
    }

    fn roles(&self, urls: &EnvironmentUrls) -> Roles {
        let output = if self.settings.sharded {
            BlockMapOutput::Sharded { origins: urls.origins.clone() }
        } else {
            BlockMapOutput::Legacy
        };
        let mut roles: Roles = IndexMap::new();
        roles.insert(
            SOURCE_ROLE,
            Box::new(SourceCaptureRole::new(
                self.backend.clone(),
                self.store.clone(),
                self.settings.snapshot_dir.clone(),
                output,
                self.settings.writer_workers,
            )),
        );
        roles.insert(FAILURE_ROLE, Box::new(FailureRole::new(self.store.clone())));
        roles
    }

    /// Crawls every group of the plan.
    ///
    /// Within a group, pages are visited in batches; every page of a batch
    /// runs concurrently on both hosts, and the next batch starts only after
    /// the whole batch (failure handling included) is done. A failing page
    /// never affects its siblings. A role that cannot persist its results
    /// yields an `Err` item and the crawl moves on to the next group.
    pub fn run<'a>(&'a self, plan: &'a CrawlPlan) -> impl Stream<Item = Result<CrawlEvent>> + 'a {
        let batch_size = self.settings.batch_size.max(1);
        stream!({
            yield Ok(CrawlEvent::Started { groups: plan.groups().len() });
            for group in plan.groups() {
                let urls = plan.environment_urls(group, self.settings.group_limit);
                if urls.is_empty() {
                    tracing::info!(label = %group.label, "no URLs discovered; skipping group");
                    continue;
                }
                tracing::info!(label = %group.label, pages = urls.len(), "starting crawl group");
                yield Ok(CrawlEvent::GroupStarted { label: group.label.clone(), pages: urls.len() });

                let roles = self.roles(&urls);
                let batches = urls.len().div_ceil(batch_size);
                let (mut succeeded, mut failed) = (0, 0);
                for index in 0..batches {
                    let visits = urls
                        .batch(index, batch_size)
                        .into_iter()
                        .map(|(url, environment)| visit_page(self.driver.as_ref(), &roles, url, environment));
                    let outcomes = join_all(visits).await;
                    let batch_succeeded = outcomes.iter().filter(|ok| **ok).count();
                    let batch_failed = outcomes.len() - batch_succeeded;
                    succeeded += batch_succeeded;
                    failed += batch_failed;
                    tracing::info!(label = %group.label, batch = index + 1, batches, "completed batch");
                    yield Ok(CrawlEvent::BatchComplete {
                        label: group.label.clone(),
                        batch: index + 1,
                        batches,
                        succeeded: batch_succeeded,
                        failed: batch_failed,
                    });
                    if index + 1 < batches && !self.settings.batch_pause.is_zero() {
                        tokio::time::sleep(self.settings.batch_pause).await;
                    }
                }

                for (name, role) in &roles {
                    if let Err(err) = role.finalize().await {
                        tracing::error!(label = %group.label, role = name, error = ?err, "role could not persist results");
                        yield Err(err);
                    }
                }
                yield Ok(CrawlEvent::GroupFinished { label: group.label.clone(), succeeded, failed });
            }
            yield Ok(CrawlEvent::Complete);
        })
    }
}

/// Visits one page with every role attached. Returns whether it succeeded.
///
/// Navigation always goes to the `martech=off` variant of the URL while roles
/// see the plain environment URL.
async fn visit_page(driver: &dyn PageDriver, roles: &Roles, url: String, environment: Environment) -> bool {
    let visited: Result<()> = async {
        for role in roles.values() {
            role.on_page_init(&url, environment).await?;
        }
        let events = driver.visit(&ensure_martech_off(&url), environment).await?;
        for event in &events {
            for role in roles.values() {
                role.on_page_event(&url, environment, event).await?;
            }
        }
        Ok(())
    }
    .await;

    let Err(err) = visited else {
        return true;
    };
    let failure = PageFailure { error: err.to_string(), stack_trace: Some(format!("{err:?}")) };
    for (name, role) in roles {
        if let Err(role_err) = role.on_page_failure(&url, environment, &failure).await {
            tracing::error!(url = %url, role = name, error = ?role_err, "role failed to record page failure");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use blockmap_config::SiteConfig;
    use blockmap_extract::BlockMap;
    use blockmap_storage::backend::MockBackend;
    use blockmap_store::{FailureRecord, StoreLayout};
    use futures::StreamExt;
    use std::path::Path;

    const PAGE: &str = r#"<main><div class="section"><div class="hero centered"></div></div></main>"#;

    fn site() -> SiteConfig {
        SiteConfig::from_json(
            r#"{
                "urls": ["https://www.adobe.com/express/", "https://www.adobe.com/express/broken"],
                "sitemap_urls": "https://www.adobe.com/express/sitemap.xml",
                "control_branch_host": "https://ctl.page",
                "experimental_branch_host": "https://exp.page"
            }"#,
        )
        .unwrap()
    }

    fn settings(sharded: bool) -> CrawlSettings {
        CrawlSettings {
            batch_size: 1,
            batch_pause: Duration::ZERO,
            writer_workers: 2,
            group_limit: 0,
            sharded,
            snapshot_dir: PathBuf::from("qa/dom_snapshots"),
        }
    }

    fn driver() -> MockDriver {
        MockDriver::default()
            .page("https://ctl.page/express/?martech=off", PAGE, &["https://ctl.page/express/code/blocks/hero/hero.js"])
            .page("https://exp.page/express/?martech=off", PAGE, &[])
            .sitemap("https://www.adobe.com/express/sitemap.xml", "<urlset></urlset>")
    }

    #[tokio::test]
    async fn test_legacy_crawl() {
        let driver = Arc::new(driver());
        let backend = Arc::new(MockBackend::default());
        let store = BlockMapStore::new(backend.clone(), StoreLayout::default());
        let plan = CrawlPlan::build(&site(), Path::new("express.json"), driver.as_ref()).await;
        let crawler = Crawler::new(driver.clone(), backend.clone(), store.clone(), settings(false));

        let events: Vec<CrawlEvent> = crawler.run(&plan).map(|event| event.unwrap()).collect().await;
        let label = "manual entries from express.json".to_string();
        assert_eq!(
            events,
            [
                CrawlEvent::Started { groups: 2 },
                CrawlEvent::GroupStarted { label: label.clone(), pages: 2 },
                CrawlEvent::BatchComplete { label: label.clone(), batch: 1, batches: 2, succeeded: 2, failed: 0 },
                CrawlEvent::BatchComplete { label: label.clone(), batch: 2, batches: 2, succeeded: 0, failed: 2 },
                CrawlEvent::GroupFinished { label, succeeded: 2, failed: 2 },
                CrawlEvent::Complete,
            ]
        );

        let visits = driver.visits();
        assert_eq!(visits.len(), 4);
        assert!(visits.iter().all(|(url, _)| url.ends_with("?martech=off")));

        let map: BlockMap = store.load_legacy().await.unwrap();
        assert_eq!(map.len(), 1);
        let mut urls: Vec<_> = map.urls().collect();
        urls.sort_unstable();
        assert_eq!(urls, ["https://ctl.page/express/", "https://exp.page/express/"]);

        let failures = store.load_failures().await.unwrap();
        let keys: Vec<_> = failures.iter().map(|FailureRecord { url, environment, .. }| (url.as_str(), environment.as_str())).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&("https://ctl.page/express/broken", "control")));
        assert!(keys.contains(&("https://exp.page/express/broken", "experimental")));
        assert!(failures.iter().all(|record| record.stack_trace.is_some()));

        let sources = store.load_source_files().await.unwrap();
        assert_eq!(sources["https://ctl.page/express/"].len(), 1);
    }

    #[tokio::test]
    async fn test_sharded_crawl_with_limit() {
        let driver = Arc::new(driver());
        let backend = Arc::new(MockBackend::default());
        let store = BlockMapStore::new(backend.clone(), StoreLayout::default());
        let plan = CrawlPlan::build(&site(), Path::new("express.json"), driver.as_ref()).await;
        let settings = CrawlSettings { group_limit: 1, ..settings(true) };
        let crawler = Crawler::new(driver.clone(), backend.clone(), store.clone(), settings);

        let events: Vec<_> = crawler.run(&plan).collect().await;
        assert!(events.iter().all(Result::is_ok));
        assert_eq!(driver.visits().len(), 2);

        let manifest = store.load_manifest().await.unwrap();
        assert_eq!(manifest.values().collect::<Vec<_>>(), ["manual entries from express.json"]);
        let shard = store.load_shard(manifest.keys().next().unwrap()).await.unwrap();
        assert_eq!(shard.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let driver = Arc::new(driver());
        let backend = Arc::new(MockBackend::default().failing_writes_to("qa/block_map.json"));
        let store = BlockMapStore::new(backend.clone(), StoreLayout::default());
        let plan = CrawlPlan::build(&site(), Path::new("express.json"), driver.as_ref()).await;
        let crawler = Crawler::new(driver, backend, store, settings(false));

        let events: Vec<_> = crawler.run(&plan).collect().await;
        assert_eq!(events.iter().filter(|event| event.is_err()).count(), 1);
        assert!(matches!(events.last(), Some(Ok(CrawlEvent::Complete))));
    }
}
