use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::driver::SitemapFetcher;

/// Only pages on the production site under this prefix are crawled.
pub const SUPPORTED_PREFIX: &str = "https://www.adobe.com/";
pub const SUPPORTED_SEGMENT: &str = "/express/";

static LOC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").unwrap());

pub fn is_supported(url: &str) -> bool {
    url.starts_with(SUPPORTED_PREFIX) && url.contains(SUPPORTED_SEGMENT)
}

/// Supported `<loc>` values of a sitemap document, first occurrence kept.
pub fn parse_sitemap(document: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    LOC.captures_iter(document)
        .filter_map(|captures| captures.get(1))
        .map(|loc| loc.as_str().trim())
        .filter(|loc| is_supported(loc) && seen.insert(*loc))
        .map(str::to_string)
        .collect()
}

/// Fetches and parses one sitemap. A sitemap that cannot be fetched
/// contributes no URLs.
pub async fn discover(fetcher: &dyn SitemapFetcher, sitemap_url: &str) -> Vec<String> {
    match fetcher.fetch_sitemap(sitemap_url).await {
        Ok(document) => {
            let urls = parse_sitemap(&document);
            tracing::info!(sitemap = sitemap_url, urls = urls.len(), "parsed sitemap");
            urls
        },
        Err(err) => {
            tracing::warn!(sitemap = sitemap_url, error = %err, "failed to fetch sitemap");
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://www.adobe.com/express/</loc></url>
  <url><LOC>
    https://www.adobe.com/express/feature/image
  </LOC></url>
  <url><loc>https://www.adobe.com/express/</loc></url>
  <url><loc>https://www.adobe.com/acrobat/</loc></url>
  <url><loc>https://blog.adobe.com/express/post</loc></url>
</urlset>"#;

    #[test]
    fn test_parse_sitemap() {
        assert_eq!(
            parse_sitemap(SITEMAP),
            ["https://www.adobe.com/express/", "https://www.adobe.com/express/feature/image"]
        );
    }

    #[test]
    fn test_parse_sitemap_garbage() {
        assert!(parse_sitemap("not xml at all").is_empty());
    }

    #[tokio::test]
    async fn test_discover() {
        let driver = MockDriver::default().sitemap("https://www.adobe.com/express/sitemap.xml", SITEMAP);
        assert_eq!(discover(&driver, "https://www.adobe.com/express/sitemap.xml").await.len(), 2);
        assert!(discover(&driver, "https://www.adobe.com/missing.xml").await.is_empty());
    }
}
