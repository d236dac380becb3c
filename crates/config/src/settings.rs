//! Layered application settings.

use blockmap_store::StoreLayout;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, Result};

/// Prefix of environment overrides; `__` separates nested keys, as in
/// `BLOCKMAP_REMOTE__DOMAIN`.
pub const ENV_PREFIX: &str = "BLOCKMAP_";
/// Stem of the configuration file in the platform config directory.
const FILE_STEM: &str = "blockmap";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub crawl: CrawlConfig,
    pub remote: RemoteConfig,
}

/// File locations. Everything except `data_dir` is relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Storage root; relative values resolve against the working directory.
    pub data_dir: PathBuf,
    /// Directory holding crawl site configuration files.
    pub site_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub legacy_map: PathBuf,
    pub shard_dir: PathBuf,
    pub failure_log: PathBuf,
    pub source_files: PathBuf,
}
impl Default for PathsConfig {
    fn default() -> Self {
        let layout = StoreLayout::default();
        Self {
            data_dir: PathBuf::from("data"),
            site_dir: PathBuf::from("sitemaps"),
            snapshot_dir: PathBuf::from("qa/dom_snapshots"),
            legacy_map: layout.legacy_map,
            shard_dir: layout.shard_dir,
            failure_log: layout.failure_log,
            source_files: layout.source_files,
        }
    }
}
impl PathsConfig {
    /// Absolute storage root.
    pub fn data_root(&self) -> Result<PathBuf> {
        if self.data_dir.is_absolute() {
            return Ok(self.data_dir.clone());
        }
        let cwd = std::env::current_dir().or_raise(|| ErrorKind::Invalid("cannot resolve working directory".into()))?;
        Ok(cwd.join(&self.data_dir))
    }

    pub fn store_layout(&self) -> StoreLayout {
        StoreLayout {
            legacy_map: self.legacy_map.clone(),
            shard_dir: self.shard_dir.clone(),
            failure_log: self.failure_log.clone(),
            source_files: self.source_files.clone(),
            ..StoreLayout::default()
        }
    }

    /// Site configuration path; relative names resolve inside `site_dir`
    /// under the storage root.
    pub fn site_file(&self, name: &Path) -> Result<PathBuf> {
        if name.is_absolute() {
            return Ok(name.to_path_buf());
        }
        Ok(self.data_root()?.join(&self.site_dir).join(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Canonical URLs per batch; each batch visits both environments.
    pub batch_size: usize,
    pub batch_pause_secs: u64,
    /// Concurrent snapshot writers.
    pub writer_workers: usize,
    /// Canonical URLs crawled per group; `0` means all of them.
    pub group_limit: usize,
    /// Write one shard per origin label instead of the single global map.
    pub sharded: bool,
}
impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_pause_secs: 3,
            writer_workers: 2,
            group_limit: 5,
            sharded: false,
        }
    }
}
impl CrawlConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Full origin URL; wins over `domain`.
    pub base_url: Option<String>,
    /// Bare origin domain, served over HTTPS.
    pub domain: Option<String>,
    pub manifest_ttl_secs: u64,
    pub shard_ttl_secs: u64,
    pub timeout_secs: u64,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            domain: None,
            manifest_ttl_secs: 300,
            shard_ttl_secs: 1800,
            timeout_secs: 10,
        }
    }
}
impl RemoteConfig {
    pub fn manifest_ttl(&self) -> Duration {
        Duration::from_secs(self.manifest_ttl_secs)
    }

    pub fn shard_ttl(&self) -> Duration {
        Duration::from_secs(self.shard_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Defaults, then the config file, then `BLOCKMAP_` environment variables.
    ///
    /// With no explicit path, `blockmap.{toml,yaml,json}` in the platform
    /// config directory is used when present. An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(explicit)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Defaults plus file layers, without the environment.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Unreadable(path.to_path_buf()));
                }
                tracing::debug!(path = %path.display(), "loading configuration file");
                Ok(merge_file(figment, path))
            },
            None => {
                let Some(dirs) = ProjectDirs::from("", "", FILE_STEM) else {
                    return Ok(figment);
                };
                let dir = dirs.config_dir();
                Ok(figment
                    .merge(Toml::file_exact(dir.join(format!("{FILE_STEM}.toml"))))
                    .merge(Yaml::file_exact(dir.join(format!("{FILE_STEM}.yaml"))))
                    .merge(Json::file_exact(dir.join(format!("{FILE_STEM}.json")))))
            },
        }
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Invalid("could not combine configuration layers".into()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.crawl.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid("crawl.batch_size must be at least 1".into()));
        }
        if self.crawl.writer_workers == 0 {
            exn::bail!(ErrorKind::Invalid("crawl.writer_workers must be at least 1".into()));
        }
        if self.remote.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("remote.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => figment.merge(Toml::file_exact(path)),
    }
}
