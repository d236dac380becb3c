//! The seam to whatever loads pages.
//!
//! A real crawl runs behind a headless browser that reports every network
//! response and the rendered DOM. [`HttpPageDriver`] is the plain HTTP
//! stand-in: it reports the document response and the served HTML.

use async_trait::async_trait;
use derive_more::Display;
use exn::ResultExt;
use std::time::Duration;

use crate::error::{ErrorKind, Result};

/// Which side of the paired crawl a page belongs to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    #[display("control")]
    Control,
    #[display("experimental")]
    Experimental,
}

/// Something observed while a page loaded, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A network response, identified by the request URL.
    Response { url: String },
    /// The page's serialized DOM once loading settled.
    Content { html: String },
}

/// Loads one page and reports what happened.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn visit(&self, url: &str, environment: Environment) -> Result<Vec<PageEvent>>;
}

/// Fetches sitemap documents.
#[async_trait]
pub trait SitemapFetcher: Send + Sync {
    async fn fetch_sitemap(&self, url: &str) -> Result<String>;
}

pub struct HttpPageDriver {
    client: reqwest::Client,
}
impl HttpPageDriver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().or_raise(|| ErrorKind::DriverSetup)?;
        Ok(Self { client })
    }

    async fn get_text(&self, url: &str) -> Result<(String, String)> {
        let response = self.client.get(url).send().await.or_raise(|| ErrorKind::Driver(url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Driver(format!("{url} (status {status})")));
        }
        let final_url = response.url().to_string();
        let text = response.text().await.or_raise(|| ErrorKind::Driver(url.to_string()))?;
        Ok((final_url, text))
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn visit(&self, url: &str, environment: Environment) -> Result<Vec<PageEvent>> {
        let (final_url, html) = self.get_text(url).await?;
        tracing::debug!(url, %environment, bytes = html.len(), "fetched page");
        Ok(vec![PageEvent::Response { url: final_url }, PageEvent::Content { html }])
    }
}

#[async_trait]
impl SitemapFetcher for HttpPageDriver {
    async fn fetch_sitemap(&self, url: &str) -> Result<String> {
        Ok(self.get_text(url).await?.1)
    }
}
