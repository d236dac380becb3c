use blockmap_config::Config;
use blockmap_fetch::{CacheTtl, CachingClient, HttpTransport, resolve_base_url};
use blockmap_search::{LocalShardSource, SearchRequest, SearchResponse, ShardSource, search};
use blockmap_storage::backend::LocalBackend;
use blockmap_store::{BlockMapStore, StoreLayout};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::SearchArgs;
use crate::error::{ErrorKind, Result};

pub async fn run(config: &Config, args: SearchArgs) -> Result<String> {
    let local_dir = args.local_dir.clone();
    let request = request(args);
    let response = match local_dir {
        Some(dir) => {
            let source = local_source(&dir)?;
            execute(&source, &request).await?
        },
        None => {
            let client = remote_source(config)?;
            let response = execute(&client, &request).await;
            client.close().await;
            response?
        },
    };
    serde_json::to_string_pretty(&response).or_raise(|| ErrorKind::Output)
}

fn request(args: SearchArgs) -> SearchRequest {
    SearchRequest {
        branch: args.branch,
        locales: args.locales,
        limit: args.limit,
        combo_limit: args.combo_limit,
        similarity_threshold: args.similarity_threshold,
        append_martech_off: args.append_martech_off,
        include_empty: args.include_empty,
        ..SearchRequest::new(args.keywords)
    }
}

async fn execute(source: &dyn ShardSource, request: &SearchRequest) -> Result<SearchResponse> {
    match search(source, request).await {
        Ok(response) => Ok(response),
        Err(err) => {
            let status = err.http_status();
            Err(err).or_raise(|| ErrorKind::Search(status))
        },
    }
}

/// Shards read straight from `dir`, which holds `index.json` and the shard files.
fn local_source(dir: &Path) -> Result<LocalShardSource> {
    let root = absolute(dir)?;
    if !root.is_dir() {
        exn::bail!(ErrorKind::Usage(format!("shard directory not found: {}", root.display())));
    }
    let backend = LocalBackend::new("shards", &root).or_raise(|| ErrorKind::Usage(format!("unusable shard directory: {}", root.display())))?;
    let layout = StoreLayout { shard_dir: PathBuf::from("."), ..StoreLayout::default() };
    Ok(LocalShardSource::new(BlockMapStore::new(Arc::new(backend), layout)))
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().or_raise(|| ErrorKind::Usage("cannot resolve working directory".to_string()))?;
    Ok(cwd.join(dir))
}

fn remote_source(config: &Config) -> Result<CachingClient> {
    let remote = &config.remote;
    let base = resolve_base_url(remote.base_url.as_deref(), remote.domain.as_deref()).or_raise(|| ErrorKind::Config)?;
    let transport = HttpTransport::new(remote.timeout()).or_raise(|| ErrorKind::Config)?;
    let ttl = CacheTtl { manifest: remote.manifest_ttl(), shard: remote.shard_ttl() };
    tracing::debug!(base = %base, "searching remote shards");
    Ok(CachingClient::new(base, Arc::new(transport), ttl))
}
