use blockmap_query::{Combination, tokenize};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

pub const DEFAULT_COMBO_LIMIT: usize = 5;
pub const MAX_COMBO_LIMIT: usize = 50;
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 80;

/// Parameters of a keyword search, as a caller supplies them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
    /// Branch token to rewrite exact-match URLs onto.
    pub branch: Option<String>,
    pub locales: Vec<String>,
    /// Maximum exact URLs per shard.
    pub limit: Option<usize>,
    pub combo_limit: usize,
    pub similarity_threshold: u8,
    /// Defaults to `true` whenever `branch` is set.
    pub append_martech_off: Option<bool>,
    pub include_empty: bool,
}
impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            branch: None,
            locales: Vec::new(),
            limit: None,
            combo_limit: DEFAULT_COMBO_LIMIT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            append_martech_off: None,
            include_empty: false,
        }
    }
}
impl SearchRequest {
    pub fn new<S: Into<String>>(keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Checks bounds and normalizes the keywords.
    pub fn validate(&self) -> Result<Query> {
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            exn::bail!(ErrorKind::Usage("at least one keyword must be supplied".to_string()));
        }
        if self.limit == Some(0) {
            exn::bail!(ErrorKind::Usage("limit must be at least 1".to_string()));
        }
        if !(1..=MAX_COMBO_LIMIT).contains(&self.combo_limit) {
            exn::bail!(ErrorKind::Usage(format!("combo_limit must be between 1 and {MAX_COMBO_LIMIT}")));
        }
        if self.similarity_threshold > 100 {
            exn::bail!(ErrorKind::Usage("similarity_threshold must be between 0 and 100".to_string()));
        }

        let text = keywords.join(" ");
        let branch = self.branch.as_deref().map(str::trim).filter(|b| !b.is_empty()).map(str::to_string);
        let append_martech_off = branch.is_some() && self.append_martech_off.unwrap_or(true);
        Ok(Query {
            tokens: tokenize(&text),
            text,
            branch,
            limit: self.limit,
            combo_limit: self.combo_limit,
            similarity_threshold: self.similarity_threshold,
            append_martech_off,
            include_empty: self.include_empty,
        })
    }
}

/// A validated search, ready to run against any number of shards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Keywords joined by spaces, scored against class combinations.
    pub text: String,
    /// Lowercased keyword tokens, matched against class sets.
    pub tokens: Vec<String>,
    pub branch: Option<String>,
    pub limit: Option<usize>,
    pub combo_limit: usize,
    pub similarity_threshold: u8,
    pub append_martech_off: bool,
    pub include_empty: bool,
}

/// Matches from one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardResult {
    /// Shard file name.
    pub block_map: String,
    /// Origin label the shard was crawled from.
    pub source_url: String,
    pub exact_urls: Vec<String>,
    pub top_combinations: Vec<Combination>,
}
impl ShardResult {
    pub fn is_empty(&self) -> bool {
        self.exact_urls.is_empty() && self.top_combinations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub keywords: Vec<String>,
    pub result_count: usize,
    pub results: Vec<ShardResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_from_json() {
        let request: SearchRequest = serde_json::from_str(r#"{"keywords": ["hero"]}"#).unwrap();
        assert_eq!(request, SearchRequest::new(["hero"]));
        assert_eq!(request.combo_limit, 5);
        assert_eq!(request.similarity_threshold, 80);
    }

    #[test]
    fn test_normalizes_keywords() {
        let query = SearchRequest::new([" Hero ", "", "  ", "centered"]).validate().unwrap();
        assert_eq!(query.text, "Hero centered");
        assert_eq!(query.tokens, ["hero", "centered"]);
    }

    #[rstest]
    #[case(None, None, false)]
    #[case(Some("  "), None, false)]
    #[case(Some("main"), None, true)]
    #[case(Some("main"), Some(false), false)]
    #[case(None, Some(true), false)]
    fn test_martech_default(#[case] branch: Option<&str>, #[case] flag: Option<bool>, #[case] expected: bool) {
        let request = SearchRequest {
            branch: branch.map(str::to_string),
            append_martech_off: flag,
            ..SearchRequest::new(["hero"])
        };
        assert_eq!(request.validate().unwrap().append_martech_off, expected);
    }

    #[rstest]
    #[case::no_keywords(SearchRequest::new(["", " "]))]
    #[case::zero_limit(SearchRequest { limit: Some(0), ..SearchRequest::new(["a"]) })]
    #[case::zero_combos(SearchRequest { combo_limit: 0, ..SearchRequest::new(["a"]) })]
    #[case::too_many_combos(SearchRequest { combo_limit: 51, ..SearchRequest::new(["a"]) })]
    #[case::threshold(SearchRequest { similarity_threshold: 101, ..SearchRequest::new(["a"]) })]
    fn test_invalid(#[case] request: SearchRequest) {
        let err = request.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Usage(_)));
        assert_eq!(err.http_status(), 400);
    }
}
