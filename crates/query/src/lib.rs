//! Stateless matching over a single in-memory [`BlockMap`](blockmap_extract::BlockMap).
//!
//! Two strategies live side by side and are deliberately not unified:
//! set-based lookups ([`exact_match`], [`full_set_match`], [`rank_by_jaccard`])
//! and approximate ranking of class combinations
//! ([`rank_by_fuzzy_combination`]). Hashing is case-sensitive while every
//! matcher here compares lowercased classes.

mod fuzzy;
mod matching;
mod tokens;
mod urls;

pub use crate::fuzzy::{Combination, rank_by_fuzzy_combination, token_set_ratio};
pub use crate::matching::{Scored, exact_match, full_set_match, rank_by_jaccard};
pub use crate::tokens::{dedupe_preserve_order, normalize_classes, tokenize};
pub use crate::urls::{ensure_martech_off, rewrite_branch};
