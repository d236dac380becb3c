use blockmap_extract::BlockMap;
use blockmap_query::{dedupe_preserve_order, ensure_martech_off, exact_match, rank_by_fuzzy_combination, rewrite_branch};
use futures::future::try_join_all;
use tracing::instrument;

use crate::error::Result;
use crate::locale::filter_by_locales;
use crate::request::{Query, SearchRequest, SearchResponse, ShardResult};
use crate::source::ShardSource;

/// Runs a query against one shard.
///
/// Exact URLs are branch-rewritten (and `martech=off` appended) when the
/// query names a branch, deduplicated, then truncated to the limit. Fuzzy
/// combinations are truncated to `combo_limit` first and only then filtered
/// by the similarity threshold.
pub fn search_shard(block_map: &BlockMap, filename: &str, source_url: &str, query: &Query) -> ShardResult {
    let mut exact_urls = exact_match(block_map, &query.tokens);
    if let Some(branch) = &query.branch {
        let rewritten = exact_urls.iter().map(|url| rewrite_branch(url, branch));
        exact_urls = if query.append_martech_off {
            dedupe_preserve_order(rewritten.map(|url| ensure_martech_off(&url)))
        } else {
            dedupe_preserve_order(rewritten)
        };
    }
    if let Some(limit) = query.limit {
        exact_urls.truncate(limit);
    }

    let top_combinations = rank_by_fuzzy_combination(block_map, &query.text, query.combo_limit)
        .into_iter()
        .filter(|combination| combination.score >= query.similarity_threshold)
        .collect();

    ShardResult {
        block_map: filename.to_string(),
        source_url: source_url.to_string(),
        exact_urls,
        top_combinations,
    }
}

/// Searches every shard in the source's manifest.
///
/// Shards are loaded concurrently and reported in manifest order. Shards
/// with no matches are left out unless `include_empty` is set. Any shard
/// failing to load fails the whole search.
#[instrument(skip(source, request), fields(keywords = ?request.keywords))]
pub async fn search(source: &dyn ShardSource, request: &SearchRequest) -> Result<SearchResponse> {
    let query = request.validate()?;
    let manifest = source.manifest().await?;
    let selected = filter_by_locales(&manifest, &request.locales);
    tracing::debug!(shards = manifest.len(), selected = selected.len(), "searching shards");

    let shards = try_join_all(selected.keys().map(|filename| source.shard(filename))).await?;
    let results: Vec<ShardResult> = selected
        .iter()
        .zip(shards)
        .map(|((filename, origin), shard)| search_shard(&shard, filename, origin, &query))
        .filter(|result| query.include_empty || !result.is_empty())
        .collect();

    tracing::info!(query = %query.text, results = results.len(), "search complete");
    Ok(SearchResponse {
        keywords: query.tokens,
        result_count: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::LocalShardSource;
    use blockmap_fetch::{CacheTtl, CachingClient, MockTransport, resolve_base_url};
    use blockmap_storage::backend::MockBackend;
    use blockmap_store::{BlockMapStore, StoreLayout};
    use std::sync::Arc;

    const HERO: &str = r#"{
        "h1": {"class_names": ["hero", "centered"], "urls": ["https://main--express--adobecom.aem.page/express/u1"]},
        "h2": {"class_names": ["hero", "left"], "urls": ["https://main--express--adobecom.aem.page/express/u2"]}
    }"#;
    const CARDS: &str = r#"{"h3": {"class_names": ["cards"], "urls": ["https://www.adobe.com/fr/express/u3"]}}"#;

    fn map(json: &str) -> BlockMap {
        serde_json::from_str(json).unwrap()
    }

    fn local_source() -> LocalShardSource {
        let backend = MockBackend::with_files([
            (
                "block_maps/index.json",
                r#"{"a.json": "https://www.adobe.com/express/sitemap.xml", "b.json": "https://www.adobe.com/fr/express/sitemap.xml"}"#,
            ),
            ("block_maps/a.json", HERO),
            ("block_maps/b.json", CARDS),
        ]);
        LocalShardSource::new(BlockMapStore::new(Arc::new(backend), StoreLayout::default()))
    }

    #[test]
    fn test_search_shard_exact_and_fuzzy() {
        let query = SearchRequest::new(["hero", "centered"]).validate().unwrap();
        let result = search_shard(&map(HERO), "a.json", "origin", &query);
        assert_eq!(result.exact_urls, ["https://main--express--adobecom.aem.page/express/u1"]);
        assert_eq!(result.top_combinations.len(), 1);
        assert_eq!(result.top_combinations[0].combination, "centered hero");
        assert_eq!(result.top_combinations[0].score, 100);
    }

    #[test]
    fn test_search_shard_fuzzy_ranking() {
        let query = SearchRequest { similarity_threshold: 0, ..SearchRequest::new(["centered"]) }.validate().unwrap();
        let result = search_shard(&map(HERO), "a.json", "origin", &query);
        let combos: Vec<_> = result.top_combinations.iter().map(|c| c.combination.as_str()).collect();
        assert_eq!(combos, ["centered hero", "hero left"]);
    }

    #[test]
    fn test_search_shard_branch_rewrite() {
        let query = SearchRequest { branch: Some("feat".into()), ..SearchRequest::new(["hero"]) }.validate().unwrap();
        let result = search_shard(&map(HERO), "a.json", "origin", &query);
        assert_eq!(
            result.exact_urls,
            [
                "https://feat--express--adobecom.aem.page/express/u1?martech=off",
                "https://feat--express--adobecom.aem.page/express/u2?martech=off",
            ]
        );

        let query = SearchRequest {
            branch: Some("feat".into()),
            append_martech_off: Some(false),
            limit: Some(1),
            ..SearchRequest::new(["hero"])
        }
        .validate()
        .unwrap();
        let result = search_shard(&map(HERO), "a.json", "origin", &query);
        assert_eq!(result.exact_urls, ["https://feat--express--adobecom.aem.page/express/u1"]);
    }

    #[test]
    fn test_search_shard_rewrite_dedupes() {
        let json = r#"{
            "h1": {"class_names": ["hero"], "urls": ["https://a--site.page/x"]},
            "h2": {"class_names": ["hero", "wide"], "urls": ["https://b--site.page/x"]}
        }"#;
        let query = SearchRequest { branch: Some("main".into()), ..SearchRequest::new(["hero"]) }.validate().unwrap();
        let result = search_shard(&map(json), "a.json", "origin", &query);
        assert_eq!(result.exact_urls, ["https://main--site.page/x?martech=off"]);
    }

    #[tokio::test]
    async fn test_search_local() {
        let response = search(&local_source(), &SearchRequest::new(["hero", "centered"])).await.unwrap();
        assert_eq!(response.keywords, ["hero", "centered"]);
        assert_eq!(response.result_count, 1);
        assert_eq!(response.results[0].block_map, "a.json");
        assert_eq!(response.results[0].source_url, "https://www.adobe.com/express/sitemap.xml");
    }

    #[tokio::test]
    async fn test_search_include_empty_and_locales() {
        let request = SearchRequest {
            include_empty: true,
            ..SearchRequest::new(["hero"])
        };
        let response = search(&local_source(), &request).await.unwrap();
        assert_eq!(response.result_count, 2);
        assert!(response.results[1].is_empty());

        let request = SearchRequest {
            include_empty: true,
            locales: vec!["fr".into()],
            ..SearchRequest::new(["hero"])
        };
        let response = search(&local_source(), &request).await.unwrap();
        assert_eq!(response.results.iter().map(|r| r.block_map.as_str()).collect::<Vec<_>>(), ["b.json"]);
    }

    #[tokio::test]
    async fn test_search_response_json() {
        let response = search(&local_source(), &SearchRequest::new(["cards"])).await.unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keywords": ["cards"],
                "result_count": 1,
                "results": [{
                    "block_map": "b.json",
                    "source_url": "https://www.adobe.com/fr/express/sitemap.xml",
                    "exact_urls": ["https://www.adobe.com/fr/express/u3"],
                    "top_combinations": [{"combination": "cards", "score": 100, "hash_key": "h3"}],
                }],
            })
        );
    }

    #[tokio::test]
    async fn test_search_rejects_before_fetching() {
        let transport = Arc::new(MockTransport::default());
        let base = resolve_base_url(Some("https://cdn.example.com"), None).unwrap();
        let client = CachingClient::new(base, transport.clone(), CacheTtl::default());
        let err = search(&client, &SearchRequest::new([" "])).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Usage(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_search_remote_errors() {
        let transport = Arc::new(
            MockTransport::default()
                .respond("/all_domains/current/index.json", 200, r#"{"a.json": "origin", "b.json": "origin"}"#)
                .respond("/all_domains/current/a.json", 200, HERO)
                .respond("/all_domains/current/b.json", 403, ""),
        );
        let base = resolve_base_url(Some("https://cdn.example.com"), None).unwrap();
        let client = CachingClient::new(base, transport, CacheTtl::default());
        let err = search(&client, &SearchRequest::new(["hero"])).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Upstream { status: 403 });
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn test_search_remote_malformed() {
        let transport = Arc::new(MockTransport::default().respond("/all_domains/current/index.json", 200, "[]"));
        let base = resolve_base_url(Some("https://cdn.example.com"), None).unwrap();
        let client = CachingClient::new(base, transport, CacheTtl::default());
        let err = search(&client, &SearchRequest::new(["hero"])).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
    }
}
