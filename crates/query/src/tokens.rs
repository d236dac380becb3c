use indexmap::IndexSet;
use std::hash::Hash;

/// Splits free text into lowercase tokens, preserving order.
///
/// ```
/// use blockmap_query::tokenize;
///
/// assert_eq!(tokenize("  Hero\tCENTERED  "), ["hero", "centered"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Normalizes class-lookup input: commas count as whitespace, tokens are
/// lowercased and deduplicated in first-seen order.
///
/// ```
/// use blockmap_query::normalize_classes;
///
/// assert_eq!(normalize_classes(["hero,centered", "Hero dark"]), ["hero", "centered", "dark"]);
/// ```
pub fn normalize_classes(raw: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let tokens = raw.into_iter().flat_map(|chunk| tokenize(&chunk.as_ref().replace(',', " ")));
    dedupe_preserve_order(tokens)
}

/// Stable de-duplication: keeps the first occurrence of every item.
pub fn dedupe_preserve_order<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    items.into_iter().collect::<IndexSet<T>>().into_iter().collect()
}
