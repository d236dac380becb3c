//! Cached access to the remote block map origin.

use blockmap_extract::{BlockMap, ShardIndex};
use exn::ResultExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::cache::TtlCache;
use crate::error::{ErrorKind, Result};
use crate::transport::Transport;

/// Remote path of the current shard set.
pub const CURRENT_PREFIX: &str = "all_domains/current/";
/// Manifest file name under [`CURRENT_PREFIX`].
pub const MANIFEST_NAME: &str = "index.json";

/// Cache lifetimes for the manifest and shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub manifest: Duration,
    pub shard: Duration,
}
impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            manifest: Duration::from_secs(300),
            shard: Duration::from_secs(1800),
        }
    }
}

/// Resolves the origin base URL from an explicit URL or a bare domain.
///
/// A bare domain is promoted to `https://<domain>`. Trailing slashes are
/// dropped; the base always ends up with exactly one for joining.
///
/// ```
/// use blockmap_fetch::resolve_base_url;
///
/// let base = resolve_base_url(None, Some("d111.cloudfront.net")).unwrap();
/// assert_eq!(base.as_str(), "https://d111.cloudfront.net/");
/// ```
pub fn resolve_base_url(base_url: Option<&str>, domain: Option<&str>) -> Result<Url> {
    let explicit = base_url.map(str::trim).filter(|s| !s.is_empty());
    let raw = match (explicit, domain.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(url), _) => url.trim_end_matches('/').to_string(),
        (None, Some(domain)) => format!("https://{}", domain.trim_end_matches('/')),
        (None, None) => exn::bail!(ErrorKind::Usage("no remote base URL or domain configured".to_string())),
    };
    Url::parse(&format!("{raw}/")).or_raise(|| ErrorKind::Usage(format!("invalid remote base URL: {raw}")))
}

/// TTL-cached, single-flight client for the manifest and shard files.
///
/// Warm reads are served from memory without touching the network. On a miss
/// exactly one request per key is in flight; concurrent callers for the same
/// key wait for it and reuse its result. A failed fetch leaves whatever was
/// cached before untouched, and the next call tries again.
pub struct CachingClient {
    base: Url,
    transport: Arc<dyn Transport>,
    manifest: TtlCache<(), ShardIndex>,
    shards: TtlCache<String, BlockMap>,
}
impl CachingClient {
    pub fn new(base: Url, transport: Arc<dyn Transport>, ttl: CacheTtl) -> Self {
        Self {
            base,
            transport,
            manifest: TtlCache::new(ttl.manifest),
            shards: TtlCache::new(ttl.shard),
        }
    }

    fn url_for(&self, name: &str) -> Result<Url> {
        let prefix = self.base.join(CURRENT_PREFIX).or_raise(|| ErrorKind::Usage(format!("cannot build URL for {name}")))?;
        let url = prefix.join(name).or_raise(|| ErrorKind::Usage(format!("cannot build URL for {name}")))?;
        if !url.as_str().starts_with(prefix.as_str()) || url.query().is_some() || url.fragment().is_some() {
            exn::bail!(ErrorKind::Usage(format!("{name} resolves outside {prefix}")));
        }
        Ok(url)
    }

    /// The shard manifest (filename to origin label).
    #[instrument(skip(self))]
    pub async fn manifest(&self) -> Result<Arc<ShardIndex>> {
        if let Some(cached) = self.manifest.fresh(&()) {
            return Ok(cached);
        }
        let lock = self.manifest.fill_lock(&());
        let _guard = lock.lock().await;
        if let Some(cached) = self.manifest.fresh(&()) {
            tracing::trace!("manifest filled while waiting");
            return Ok(cached);
        }

        let url = self.url_for(MANIFEST_NAME)?;
        let body = self.fetch(&url).await?;
        let manifest = parse_manifest(&body).or_raise(|| ErrorKind::Malformed(url.to_string()))?;
        tracing::info!(url = %url, shards = manifest.len(), "refreshed shard manifest");
        Ok(self.manifest.store((), manifest))
    }

    /// One block map shard by file name.
    #[instrument(skip(self))]
    pub async fn shard(&self, filename: &str) -> Result<Arc<BlockMap>> {
        let filename = validate_shard_name(filename)?;
        let key = filename.to_string();
        if let Some(cached) = self.shards.fresh(&key) {
            return Ok(cached);
        }
        let lock = self.shards.fill_lock(&key);
        let _guard = lock.lock().await;
        if let Some(cached) = self.shards.fresh(&key) {
            tracing::trace!("shard filled while waiting");
            return Ok(cached);
        }

        let url = self.url_for(filename)?;
        let body = self.fetch(&url).await?;
        let shard = parse_shard(&body).or_raise(|| ErrorKind::Malformed(url.to_string()))?;
        tracing::info!(url = %url, entries = shard.len(), "refreshed shard");
        Ok(self.shards.store(key, shard))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            tracing::warn!(url = %url, status = response.status, "upstream error");
            exn::bail!(ErrorKind::Upstream {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    /// Releases the transport's connection pool.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

/// Checks a shard file name taken from a manifest or a caller.
///
/// The name must be a single plain path segment: not blank, not `.` or `..`,
/// and free of separators and URL syntax (`/`, `\`, `?`, `#`, `:`, `%`).
/// Returns the trimmed name.
///
/// ```
/// use blockmap_fetch::validate_shard_name;
///
/// assert_eq!(validate_shard_name(" block-map-0123456789ab.json ").unwrap(), "block-map-0123456789ab.json");
/// assert!(validate_shard_name("../index.json").is_err());
/// assert!(validate_shard_name("https:evil.json").is_err());
/// ```
pub fn validate_shard_name(filename: &str) -> Result<&str> {
    let filename = filename.trim();
    if filename.is_empty() {
        exn::bail!(ErrorKind::Usage("shard filename is blank".to_string()));
    }
    if matches!(filename, "." | "..") || filename.contains(['/', '\\', '?', '#', ':', '%']) {
        exn::bail!(ErrorKind::Usage(format!("invalid shard filename: {filename:?}")));
    }
    Ok(filename)
}

/// The manifest must be a JSON object of string values.
fn parse_manifest(body: &[u8]) -> std::result::Result<ShardIndex, serde_json::Error> {
    serde_json::from_slice(body)
}

/// A shard must be a JSON object of entries; arrays and `null` fail the parse.
fn parse_shard(body: &[u8]) -> std::result::Result<BlockMap, serde_json::Error> {
    serde_json::from_slice(body)
}
