//! Approximate ranking of class combinations.

use blockmap_extract::{BlockMap, SignatureHash};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::instrument;

/// A normalized class combination and how well it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combination {
    /// Sorted, lowercased class names joined by single spaces.
    pub combination: String,
    /// Token-set overlap ratio, `0..=100`.
    pub score: u8,
    /// Hash of the first entry that produced this combination.
    #[serde(rename = "hash_key")]
    pub hash: SignatureHash,
}

/// Ranks the map's distinct class combinations against free text.
///
/// Every entry is reduced to its normalized combination string. Entries with
/// no usable classes are skipped, and when several entries reduce to the same
/// string only the first one (in map order) is kept and scored. Returns at
/// most `top_k` results, best first, ties in map order. A blank query returns
/// nothing.
///
/// No threshold is applied here; callers filter the truncated list.
#[instrument(level = "trace", skip(block_map), fields(entries = block_map.len()))]
pub fn rank_by_fuzzy_combination(block_map: &BlockMap, query: &str, top_k: usize) -> Vec<Combination> {
    let query = query.trim().to_lowercase();
    if query.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut combinations: IndexMap<String, &SignatureHash> = IndexMap::new();
    for (hash, entry) in block_map.iter() {
        let mut classes: Vec<String> = entry.normalized_classes().collect();
        if classes.is_empty() {
            continue;
        }
        classes.sort_unstable();
        if let Entry::Vacant(slot) = combinations.entry(classes.join(" ")) {
            slot.insert(hash);
        }
    }

    let mut scored: Vec<Combination> = combinations
        .into_iter()
        .map(|(combination, hash)| Combination {
            score: token_set_ratio(&query, &combination),
            combination,
            hash: hash.clone(),
        })
        .collect();
    // Stable: equal scores keep map order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(top_k);
    scored
}

/// Order- and duplicate-insensitive similarity of two token lists, `0..=100`.
///
/// Both strings are split on whitespace into token sets. If one set is
/// contained in the other (and they share anything) the score is 100.
/// Otherwise the shared tokens are compared against each side's full sorted
/// token string by normalized indel similarity and the best comparison wins.
/// The score is truncated, never rounded.
///
/// ```
/// use blockmap_query::token_set_ratio;
///
/// assert_eq!(token_set_ratio("centered", "centered hero"), 100);
/// assert_eq!(token_set_ratio("centered hero", "hero left"), 63);
/// ```
pub fn token_set_ratio(left: &str, right: &str) -> u8 {
    let left: BTreeSet<&str> = left.split_whitespace().collect();
    let right: BTreeSet<&str> = right.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let shared = left.intersection(&right).copied().collect::<Vec<_>>().join(" ");
    let only_left = left.difference(&right).copied().collect::<Vec<_>>().join(" ");
    let only_right = right.difference(&left).copied().collect::<Vec<_>>().join(" ");
    if !shared.is_empty() && (only_left.is_empty() || only_right.is_empty()) {
        return 100;
    }

    let with_left = join_nonempty(&shared, &only_left);
    let with_right = join_nonempty(&shared, &only_right);
    let mut best = similarity(&with_left, &with_right);
    if !shared.is_empty() {
        best = best.max(similarity(&shared, &with_left)).max(similarity(&shared, &with_right));
    }
    // Truncation towards zero; `best` is always within 0..=100.
    best as u8
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Normalized indel similarity in `0.0..=100.0`.
fn similarity(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 100.0;
    }
    let distance = total - 2 * longest_common_subsequence(&left, &right);
    100.0 * (1.0 - distance as f64 / total as f64)
}

fn longest_common_subsequence(left: &[char], right: &[char]) -> usize {
    let mut previous = vec![0usize; right.len() + 1];
    let mut current = vec![0usize; right.len() + 1];
    for a in left {
        for (j, b) in right.iter().enumerate() {
            current[j + 1] = if a == b { previous[j] + 1 } else { previous[j + 1].max(current[j]) };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "hero", 0)]
    #[case("hero", "   ", 0)]
    #[case("hero", "hero", 100)]
    #[case("centered", "centered hero", 100)]
    #[case("hero hero centered", "centered hero", 100)]
    #[case("centered hero", "hero left", 63)]
    #[case("centered", "hero left", 35)]
    #[case("abc", "abd", 66)]
    #[case("hero", "cards", 22)]
    fn test_token_set_ratio(#[case] left: &str, #[case] right: &str, #[case] expected: u8) {
        assert_eq!(token_set_ratio(left, right), expected);
        assert_eq!(token_set_ratio(right, left), expected);
    }

    #[test]
    fn test_lcs() {
        let left: Vec<char> = "centered".chars().collect();
        let right: Vec<char> = "left".chars().collect();
        assert_eq!(longest_common_subsequence(&left, &right), 2);
    }

    fn fixture() -> BlockMap {
        serde_json::from_str(
            r#"{
                "h1": {"class_names": ["hero", "centered"], "urls": ["u1"]},
                "h2": {"class_names": ["hero", "left"], "urls": ["u2"]},
                "h3": {"class_names": ["Centered", " HERO "], "urls": ["u3"]},
                "h4": {"class_names": ["", "  "], "urls": ["u4"]},
                "h5": {"class_names": ["cards"], "urls": ["u5"]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_fuzzy_ranking() {
        let ranked = rank_by_fuzzy_combination(&fixture(), "centered", 5);
        assert_eq!(ranked[0].combination, "centered hero");
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[0].hash.as_str(), "h1");
        let left = ranked.iter().find(|c| c.combination == "hero left").unwrap();
        assert!(left.score < ranked[0].score);
    }

    #[test]
    fn test_fuzzy_collapses_duplicate_combinations() {
        let ranked = rank_by_fuzzy_combination(&fixture(), "hero centered", 10);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|c| c.hash.as_str() != "h3" && c.hash.as_str() != "h4"));
    }

    #[test]
    fn test_fuzzy_limit_and_blank_query() {
        assert_eq!(rank_by_fuzzy_combination(&fixture(), "hero", 1).len(), 1);
        assert!(rank_by_fuzzy_combination(&fixture(), "   ", 5).is_empty());
        assert!(rank_by_fuzzy_combination(&fixture(), "hero", 0).is_empty());
    }

    #[test]
    fn test_fuzzy_ties_keep_map_order() {
        let ranked = rank_by_fuzzy_combination(&fixture(), "hero", 5);
        assert_eq!(ranked.iter().map(|c| c.hash.as_str()).collect::<Vec<_>>()[..2], ["h1", "h2"]);
    }

    #[test]
    fn test_serialized_shape() {
        let combination = Combination {
            combination: "centered hero".to_string(),
            score: 100,
            hash: SignatureHash::from("h1"),
        };
        assert_eq!(
            serde_json::to_string(&combination).unwrap(),
            r#"{"combination":"centered hero","score":100,"hash_key":"h1"}"#
        );
    }
}
