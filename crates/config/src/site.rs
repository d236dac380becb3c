//! Crawl site configuration.

use exn::ResultExt;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ErrorKind, Result};

/// Which pages to crawl and which two hosts to compare.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Manually listed canonical URLs.
    #[serde(default, deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    /// Sitemaps to discover canonical URLs from.
    #[serde(default, deserialize_with = "one_or_many")]
    pub sitemap_urls: Vec<String>,
    #[serde(default)]
    pub sitemap_url: Option<String>,
    /// Scheme and host of the control environment, e.g. `https://main--express--adobecom.aem.page`.
    pub control_branch_host: String,
    pub experimental_branch_host: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl SiteConfig {
    /// Reads a site configuration file. Failure here is fatal to a crawl.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))?;
        let config = Self::from_json(&contents).or_raise(|| ErrorKind::Malformed(path.to_path_buf()))?;
        tracing::info!(
            path = %path.display(),
            urls = config.urls.len(),
            sitemaps = config.sitemap_sources().len(),
            "loaded site configuration"
        );
        Ok(config)
    }

    pub fn from_json(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// `sitemap_urls` followed by `sitemap_url`, trimmed, blanks dropped,
    /// first occurrence kept.
    pub fn sitemap_sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sitemap_urls
            .iter()
            .chain(self.sitemap_url.iter())
            .map(|source| source.trim())
            .filter(|source| !source.is_empty() && seen.insert(*source))
            .map(str::to_string)
            .collect()
    }
}
