//! Set-based matching: subset (AND) lookup, exact-set lookup and Jaccard
//! ranking.

use blockmap_extract::{BlockMap, BlockMapEntry, SignatureHash};
use std::collections::HashSet;
use tracing::instrument;

use crate::tokens::dedupe_preserve_order;

/// An entry paired with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored<'a> {
    pub hash: &'a SignatureHash,
    pub entry: &'a BlockMapEntry,
    /// Jaccard similarity in `(0, 1]`.
    pub score: f64,
}

fn class_set(entry: &BlockMapEntry) -> HashSet<String> {
    entry.normalized_classes().collect()
}

/// URLs of every entry whose (lowercased) classes include all `tokens`.
///
/// Extra classes on the entry are allowed. Empty `tokens` match nothing. URLs
/// are deduplicated in map order.
#[instrument(level = "trace", skip(block_map), fields(entries = block_map.len()))]
pub fn exact_match(block_map: &BlockMap, tokens: &[String]) -> Vec<String> {
    let wanted: HashSet<String> = tokens.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
    if wanted.is_empty() {
        return Vec::new();
    }
    let urls = block_map
        .iter()
        .filter(|(_, entry)| wanted.is_subset(&class_set(entry)))
        .flat_map(|(_, entry)| entry.urls.iter().cloned());
    dedupe_preserve_order(urls)
}

/// First entry (in map order) whose class set equals the query set exactly.
#[instrument(level = "trace", skip(block_map), fields(entries = block_map.len()))]
pub fn full_set_match<'a>(block_map: &'a BlockMap, query: &[String]) -> Option<(&'a SignatureHash, &'a BlockMapEntry)> {
    let wanted: HashSet<String> = query.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
    if wanted.is_empty() {
        return None;
    }
    block_map.iter().find(|(_, entry)| class_set(entry) == wanted)
}

/// Ranks entries by Jaccard similarity to the query, best first.
///
/// Entries sharing no class with the query are dropped. Ties go to the entry
/// whose size is closest to the query's, then to the larger entry, then to
/// the lower hash.
#[instrument(level = "trace", skip(block_map), fields(entries = block_map.len()))]
pub fn rank_by_jaccard<'a>(block_map: &'a BlockMap, query: &[String], top_k: usize) -> Vec<Scored<'a>> {
    let wanted: HashSet<String> = query.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
    if wanted.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(Scored<'a>, usize, usize)> = block_map
        .iter()
        .filter_map(|(hash, entry)| {
            let classes = class_set(entry);
            let shared = classes.intersection(&wanted).count();
            if shared == 0 {
                return None;
            }
            let union = classes.union(&wanted).count();
            let score = shared as f64 / union as f64;
            Some((Scored { hash, entry, score }, classes.len().abs_diff(wanted.len()), classes.len()))
        })
        .collect();

    // Sizes are of the normalized class sets, never the raw lists.
    ranked.sort_by(|(a, a_diff, a_len), (b, b_diff, b_len)| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a_diff.cmp(b_diff))
            .then_with(|| b_len.cmp(a_len))
            .then_with(|| a.hash.cmp(b.hash))
    });
    ranked.truncate(top_k);
    ranked.into_iter().map(|(scored, _, _)| scored).collect()
}

impl Scored<'_> {
    /// Score rounded to four decimal places, as reported to users.
    pub fn rounded_score(&self) -> f64 {
        (self.score * 10_000.0).round() / 10_000.0
    }
}
