use blockmap_extract::ShardIndex;
use std::collections::HashSet;
use url::Url;

/// Pseudo-locale for the primary site.
pub const DEFAULT_LOCALE: &str = "default";
/// First path segment of the primary site.
const CANONICAL_SEGMENT: &str = "express";

/// Locale of a shard's origin, from the first path segment of its URL.
///
/// `None` when the path has no segments. Labels that are not URLs are read
/// as a bare path.
pub fn classify_locale(origin: &str) -> Option<String> {
    let path = match Url::parse(origin) {
        Ok(url) => url.path().to_string(),
        Err(_) => origin.to_string(),
    };
    let first = path.split('/').find(|segment| !segment.is_empty())?.to_lowercase();
    if first == CANONICAL_SEGMENT {
        Some(DEFAULT_LOCALE.to_string())
    } else {
        Some(first)
    }
}

/// Keeps the shards whose origin locale was asked for.
///
/// Locale tokens are trimmed and lowercased and blanks dropped; no tokens
/// means no filtering. `default` matches both locale-less origins and the
/// canonical site.
pub fn filter_by_locales<S: AsRef<str>>(manifest: &ShardIndex, locales: &[S]) -> ShardIndex {
    let wanted: HashSet<String> = locales
        .iter()
        .map(|locale| locale.as_ref().trim().to_lowercase())
        .filter(|locale| !locale.is_empty())
        .collect();
    if wanted.is_empty() {
        return manifest.clone();
    }
    manifest
        .iter()
        .filter(|(_, origin)| {
            let locale = classify_locale(origin).unwrap_or_else(|| DEFAULT_LOCALE.to_string());
            wanted.contains(&locale)
        })
        .map(|(filename, origin)| (filename.clone(), origin.clone()))
        .collect()
}
