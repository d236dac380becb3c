use blockmap_config::{Config, SiteConfig};
use blockmap_crawl::{CrawlEvent, CrawlPlan, CrawlSettings, Crawler, HttpPageDriver, PageDriver};
use blockmap_storage::backend::LocalBackend;
use blockmap_store::BlockMapStore;
use exn::ResultExt;
use futures::StreamExt;
use std::sync::Arc;

use crate::cli::CrawlArgs;
use crate::error::{ErrorKind, Result};

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    groups: usize,
    succeeded: usize,
    failed: usize,
    errors: usize,
}

pub async fn run(config: &Config, args: CrawlArgs) -> Result<String> {
    let paths = &config.paths;
    let site_file = paths.site_file(&args.site).or_raise(|| ErrorKind::Config)?;
    let site = SiteConfig::load(&site_file).or_raise(|| ErrorKind::Config)?;

    let mut settings = CrawlSettings::from_config(paths, &config.crawl);
    settings.sharded |= args.sharded;
    if let Some(limit) = args.limit {
        settings.group_limit = limit;
    }
    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 {
            exn::bail!(ErrorKind::Usage("batch size must be at least 1".to_string()));
        }
        settings.batch_size = batch_size;
    }

    let root = paths.data_root().or_raise(|| ErrorKind::Config)?;
    let backend = Arc::new(LocalBackend::new("data", &root).or_raise(|| ErrorKind::Config)?);
    let store = BlockMapStore::new(backend.clone(), paths.store_layout());
    let driver = Arc::new(HttpPageDriver::new(config.remote.timeout()).or_raise(|| ErrorKind::Crawl)?);

    let plan = CrawlPlan::build(&site, &site_file, driver.as_ref()).await;
    tracing::info!(site = %site_file.display(), groups = plan.groups().len(), sharded = settings.sharded, "crawl planned");
    let crawler = Crawler::new(driver as Arc<dyn PageDriver>, backend, store, settings);
    let summary = drive(&crawler, &plan).await;
    Ok(format!(
        "Crawled {} group(s): {} page(s) succeeded, {} failed, {} persistence error(s)",
        summary.groups, summary.succeeded, summary.failed, summary.errors
    ))
}

async fn drive(crawler: &Crawler, plan: &CrawlPlan) -> Summary {
    let mut summary = Summary::default();
    let events = crawler.run(plan);
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(CrawlEvent::GroupStarted { label, pages }) => tracing::info!(%label, pages, "crawling group"),
            Ok(CrawlEvent::BatchComplete { label, batch, batches, succeeded, failed }) => {
                tracing::debug!(%label, batch, batches, succeeded, failed, "batch done");
            },
            Ok(CrawlEvent::GroupFinished { label, succeeded, failed }) => {
                tracing::info!(%label, succeeded, failed, "group done");
                summary.groups += 1;
                summary.succeeded += succeeded;
                summary.failed += failed;
            },
            Ok(CrawlEvent::Started { .. } | CrawlEvent::Complete) => {},
            Err(err) => {
                tracing::error!(error = ?err, "crawl results not persisted");
                summary.errors += 1;
            },
        }
    }
    summary
}
