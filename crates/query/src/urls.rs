//! Environment URL rewriting for result links.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const MARTECH_PARAM: &str = "martech";
const MARTECH_OFF: &str = "off";

/// `scheme://<token>--<rest>`, where `<token>` is the branch prefix of a
/// preview host and never contains a slash.
static BRANCH_HOST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*://)(?P<token>[^/]+?)--(?P<rest>.*)$").unwrap());

/// Points a preview-host URL at another branch.
///
/// Only URLs shaped like `scheme://<token>--<rest>` are touched: the first
/// `<token>` is replaced by `branch`. Everything else, including a blank
/// `branch`, is returned unchanged.
///
/// ```
/// use blockmap_query::rewrite_branch;
///
/// assert_eq!(rewrite_branch("https://foo--bar.com/x", "baz"), "https://baz--bar.com/x");
/// assert_eq!(rewrite_branch("https://plain.com/x", "baz"), "https://plain.com/x");
/// ```
pub fn rewrite_branch(url: &str, branch: &str) -> String {
    let branch = branch.trim();
    if branch.is_empty() {
        return url.to_string();
    }
    match BRANCH_HOST_REGEX.captures(url) {
        Some(captures) => format!("{}{branch}--{}", &captures["scheme"], &captures["rest"]),
        None => url.to_string(),
    }
}

/// Ensures the URL disables marketing tech via `martech=off`.
///
/// An existing `martech` parameter is never overridden, whatever its value.
/// The rest of the URL is kept byte for byte; the parameter is spliced in
/// ahead of any fragment.
///
/// ```
/// use blockmap_query::ensure_martech_off;
///
/// assert_eq!(ensure_martech_off("https://x.com/a?b=1"), "https://x.com/a?b=1&martech=off");
/// assert_eq!(ensure_martech_off("https://x.com/a?martech=on"), "https://x.com/a?martech=on");
/// ```
pub fn ensure_martech_off(url: &str) -> String {
    let (before_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let already_set = match Url::parse(url) {
        Ok(parsed) => parsed.query_pairs().any(|(key, _)| key == MARTECH_PARAM),
        Err(err) => {
            tracing::trace!(url, error = %err, "unparseable URL; checking query literally");
            before_fragment
                .split_once('?')
                .is_some_and(|(_, query)| query.split('&').any(|pair| pair.split('=').next() == Some(MARTECH_PARAM)))
        },
    };
    if already_set {
        return url.to_string();
    }

    let separator = match before_fragment.split_once('?') {
        None => "?",
        Some((_, query)) if query.is_empty() || query.ends_with('&') => "",
        Some(_) => "&",
    };
    let mut out = format!("{before_fragment}{separator}{MARTECH_PARAM}={MARTECH_OFF}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
