//! Which canonical pages to crawl, grouped by where they were discovered.

use blockmap_config::SiteConfig;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

use crate::driver::{Environment, SitemapFetcher};
use crate::sitemap::discover;

/// Origin label for pages whose discovering source is unknown.
pub const MANUAL_FALLBACK_LABEL: &str = "manual entries";

/// Label of the manually listed URLs of a site configuration file.
pub fn manual_label(site_file: &Path) -> String {
    let name = site_file.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    format!("{MANUAL_FALLBACK_LABEL} from {name}")
}

/// Moves a canonical URL onto an environment host, keeping its path and query.
///
/// ```
/// use blockmap_crawl::environment_url;
///
/// assert_eq!(
///     environment_url("https://www.adobe.com/express/feature?x=1", "https://main--express--adobecom.aem.page"),
///     "https://main--express--adobecom.aem.page/express/feature?x=1",
/// );
/// assert_eq!(environment_url("/express/", "https://stage.example.com/"), "https://stage.example.com/express/");
/// ```
pub fn environment_url(url: &str, host: &str) -> String {
    let host = host.trim_end_matches('/');
    if url.starts_with('/') {
        return format!("{host}{url}");
    }
    let location = match url.split_once("//") {
        Some((_, authority_and_path)) => authority_and_path.find('/').map_or("", |slash| &authority_and_path[slash + 1..]),
        None => url,
    };
    format!("{host}/{location}")
}

/// Canonical URLs from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGroup {
    /// Sitemap URL, or the manual entries label.
    pub label: String,
    pub canonical: Vec<String>,
}

/// One group's URLs on both hosts, plus the origin label of each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentUrls {
    pub control: Vec<String>,
    pub experimental: Vec<String>,
    /// Environment URL to origin label.
    pub origins: IndexMap<String, String>,
}
impl EnvironmentUrls {
    pub fn len(&self) -> usize {
        self.control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.control.is_empty()
    }

    /// Control and experimental URLs for batch `index` of `size`.
    pub fn batch(&self, index: usize, size: usize) -> Vec<(String, Environment)> {
        let slice = |urls: &[String]| -> Vec<String> { urls.iter().skip(index * size).take(size).cloned().collect() };
        let control = slice(&self.control).into_iter().map(|url| (url, Environment::Control));
        let experimental = slice(&self.experimental).into_iter().map(|url| (url, Environment::Experimental));
        control.chain(experimental).collect()
    }
}

/// Every group to crawl, manual entries first, then one group per sitemap.
///
/// A canonical URL belongs to the first group that lists it.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    control_host: String,
    experimental_host: String,
    groups: Vec<UrlGroup>,
}
impl CrawlPlan {
    pub async fn build(site: &SiteConfig, site_file: &Path, fetcher: &dyn SitemapFetcher) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut groups = Vec::new();

        let manual: Vec<String> = site
            .urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty() && seen.insert(url.to_string()))
            .map(str::to_string)
            .collect();
        if !manual.is_empty() {
            groups.push(UrlGroup { label: manual_label(site_file), canonical: manual });
        }

        for source in site.sitemap_sources() {
            let canonical: Vec<String> =
                discover(fetcher, &source).await.into_iter().filter(|url| seen.insert(url.clone())).collect();
            groups.push(UrlGroup { label: source, canonical });
        }

        Self {
            control_host: site.control_branch_host.clone(),
            experimental_host: site.experimental_branch_host.clone(),
            groups,
        }
    }

    pub fn groups(&self) -> &[UrlGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Environment URLs for the first `limit` canonical URLs of a group, all
    /// of them when `limit` is zero.
    pub fn environment_urls(&self, group: &UrlGroup, limit: usize) -> EnvironmentUrls {
        let take = if limit == 0 { usize::MAX } else { limit };
        let mut urls = EnvironmentUrls::default();
        for canonical in group.canonical.iter().take(take) {
            let control = environment_url(canonical, &self.control_host);
            let experimental = environment_url(canonical, &self.experimental_host);
            urls.origins.insert(control.clone(), group.label.clone());
            urls.origins.insert(experimental.clone(), group.label.clone());
            urls.control.push(control);
            urls.experimental.push(experimental);
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.adobe.com/express/", "https://ctl.page", "https://ctl.page/express/")]
    #[case("https://www.adobe.com/", "https://ctl.page/", "https://ctl.page/")]
    #[case("https://www.adobe.com", "https://ctl.page", "https://ctl.page/")]
    #[case("/fr/express/", "https://ctl.page", "https://ctl.page/fr/express/")]
    #[case("express/pricing", "https://ctl.page", "https://ctl.page/express/pricing")]
    fn test_environment_url(#[case] url: &str, #[case] host: &str, #[case] expected: &str) {
        assert_eq!(environment_url(url, host), expected);
    }

    #[test]
    fn test_manual_label() {
        assert_eq!(manual_label(Path::new("/srv/sitemaps/express.json")), "manual entries from express.json");
    }

    fn site() -> SiteConfig {
        SiteConfig::from_json(
            r#"{
                "urls": ["https://www.adobe.com/express/", " ", "https://www.adobe.com/express/pricing"],
                "sitemap_urls": ["https://www.adobe.com/express/sitemap.xml", "https://www.adobe.com/missing.xml"],
                "control_branch_host": "https://main--express--adobecom.aem.page",
                "experimental_branch_host": "https://exp--express--adobecom.aem.page"
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_plan() {
        let driver = MockDriver::default().sitemap(
            "https://www.adobe.com/express/sitemap.xml",
            "<loc>https://www.adobe.com/express/</loc><loc>https://www.adobe.com/express/templates</loc>",
        );
        let plan = CrawlPlan::build(&site(), Path::new("express.json"), &driver).await;
        let groups = plan.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].label, "manual entries from express.json");
        assert_eq!(groups[0].canonical, ["https://www.adobe.com/express/", "https://www.adobe.com/express/pricing"]);
        // Already listed manually.
        assert_eq!(groups[1].canonical, ["https://www.adobe.com/express/templates"]);
        assert_eq!(groups[2].label, "https://www.adobe.com/missing.xml");
        assert!(groups[2].canonical.is_empty());
    }

    #[tokio::test]
    async fn test_environment_urls() {
        let plan = CrawlPlan::build(&site(), Path::new("express.json"), &MockDriver::default()).await;
        let urls = plan.environment_urls(&plan.groups()[0], 1);
        assert_eq!(urls.control, ["https://main--express--adobecom.aem.page/express/"]);
        assert_eq!(urls.experimental, ["https://exp--express--adobecom.aem.page/express/"]);
        assert_eq!(urls.origins["https://exp--express--adobecom.aem.page/express/"], "manual entries from express.json");

        let all = plan.environment_urls(&plan.groups()[0], 0);
        assert_eq!(all.len(), 2);
        let batch = all.batch(0, 1);
        assert_eq!(
            batch,
            [
                ("https://main--express--adobecom.aem.page/express/".to_string(), Environment::Control),
                ("https://exp--express--adobecom.aem.page/express/".to_string(), Environment::Experimental),
            ]
        );
        assert_eq!(all.batch(1, 1).len(), 2);
        assert!(all.batch(2, 1).is_empty());
    }
}
