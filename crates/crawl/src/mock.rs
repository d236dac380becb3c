//! Scripted page driver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::driver::{Environment, PageDriver, PageEvent, SitemapFetcher};
use crate::error::{ErrorKind, Result};

/// In-memory [`PageDriver`] and [`SitemapFetcher`].
///
/// Pages and sitemaps are keyed by the exact URL requested. Unknown pages
/// fail to load and unknown sitemaps fail to fetch. Every visit is recorded.
#[derive(Default)]
pub struct MockDriver {
    pages: HashMap<String, Vec<PageEvent>>,
    sitemaps: HashMap<String, String>,
    visits: Mutex<Vec<(String, Environment)>>,
}
impl MockDriver {
    /// Serve `html` at `url`, after a response event for each of `scripts`.
    pub fn page(mut self, url: &str, html: &str, scripts: &[&str]) -> Self {
        let mut events: Vec<PageEvent> =
            scripts.iter().map(|script| PageEvent::Response { url: script.to_string() }).collect();
        events.push(PageEvent::Content { html: html.to_string() });
        self.pages.insert(url.to_string(), events);
        self
    }

    pub fn sitemap(mut self, url: &str, body: &str) -> Self {
        self.sitemaps.insert(url.to_string(), body.to_string());
        self
    }

    /// URLs visited so far, in order.
    pub fn visits(&self) -> Vec<(String, Environment)> {
        self.visits.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn visit(&self, url: &str, environment: Environment) -> Result<Vec<PageEvent>> {
        self.visits.lock().unwrap_or_else(|p| p.into_inner()).push((url.to_string(), environment));
        match self.pages.get(url) {
            Some(events) => Ok(events.clone()),
            None => exn::bail!(ErrorKind::Driver(url.to_string())),
        }
    }
}

#[async_trait]
impl SitemapFetcher for MockDriver {
    async fn fetch_sitemap(&self, url: &str) -> Result<String> {
        match self.sitemaps.get(url) {
            Some(body) => Ok(body.clone()),
            None => exn::bail!(ErrorKind::Driver(url.to_string())),
        }
    }
}
