use super::{BlockMapEntry, ClassSignature, SignatureHash};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

/// Manifest of shard files: shard filename to the origin label (sitemap URL or
/// manual-entries label) whose pages it indexes.
pub type ShardIndex = IndexMap<String, String>;

/// Content-addressed index of class signatures.
///
/// Iteration follows first insertion, and survives a JSON round-trip, so the
/// query engine's "first seen" tie-breaks are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockMap {
    entries: IndexMap<SignatureHash, BlockMapEntry>,
}
impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<&BlockMapEntry> {
        self.entries.get(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SignatureHash, &BlockMapEntry)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, hash: SignatureHash, entry: BlockMapEntry) -> Option<BlockMapEntry> {
        self.entries.insert(hash, entry)
    }

    /// Records that `signature` was seen on `url`.
    ///
    /// The first sighting fixes the entry's class names; later sightings only
    /// add the URL if it is not already listed. Empty signatures are ignored.
    pub fn register(&mut self, signature: &ClassSignature, url: &str) -> Option<SignatureHash> {
        if signature.is_empty() {
            return None;
        }
        let hash = signature.hash();
        self.entries
            .entry(hash.clone())
            .or_insert_with(|| BlockMapEntry::new(signature.tokens()))
            .add_url(url);
        Some(hash)
    }

    /// Folds a fragment from the same run into this map.
    ///
    /// Uses registration semantics: existing class names are kept, URLs are
    /// unioned.
    pub fn absorb(&mut self, fragment: BlockMap) {
        for (hash, incoming) in fragment.entries {
            match self.entries.entry(hash) {
                Entry::Occupied(mut existing) => existing.get_mut().urls.extend(incoming.urls),
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                },
            }
        }
    }

    /// Merges a newer run into this (persisted) map.
    ///
    /// For a shared hash the URLs are unioned (existing first) and the class
    /// names are replaced by the newer run's. URLs are never removed.
    pub fn merge(&mut self, newer: BlockMap) {
        for (hash, incoming) in newer.entries {
            match self.entries.entry(hash) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.urls.extend(incoming.urls);
                    existing.class_names = incoming.class_names;
                },
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                },
            }
        }
    }

    /// Every URL referenced by any entry, in first-seen order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        let mut seen = indexmap::IndexSet::new();
        for entry in self.entries.values() {
            seen.extend(entry.urls.iter().map(String::as_str));
        }
        seen.into_iter()
    }
}
impl FromIterator<(SignatureHash, BlockMapEntry)> for BlockMap {
    fn from_iter<T: IntoIterator<Item = (SignatureHash, BlockMapEntry)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
impl IntoIterator for BlockMap {
    type Item = (SignatureHash, BlockMapEntry);
    type IntoIter = indexmap::map::IntoIter<SignatureHash, BlockMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(json: &str) -> BlockMap {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_register_first_sighting_fixes_class_names() {
        let mut block_map = BlockMap::new();
        let first = ClassSignature::new(["hero", "centered"]);
        let reordered = ClassSignature::new(["centered", "hero"]);
        let hash = block_map.register(&first, "u1").unwrap();
        assert_eq!(block_map.register(&reordered, "u2"), Some(hash.clone()));
        block_map.register(&first, "u1");

        let entry = block_map.get(hash.as_str()).unwrap();
        assert_eq!(entry.class_names, ["hero", "centered"]);
        assert_eq!(entry.urls.iter().collect::<Vec<_>>(), ["u1", "u2"]);
        assert_eq!(block_map.len(), 1);
    }

    #[test]
    fn test_register_ignores_empty_signature() {
        let mut block_map = BlockMap::new();
        assert_eq!(block_map.register(&ClassSignature::default(), "u1"), None);
        assert!(block_map.is_empty());
    }

    #[test]
    fn test_merge_unions_urls_and_replaces_class_names() {
        let mut persisted = map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#);
        persisted.merge(map(r#"{"h1":{"class_names":["a","b"],"urls":["u2"]}}"#));
        assert_eq!(persisted, map(r#"{"h1":{"class_names":["a","b"],"urls":["u1","u2"]}}"#));
    }

    #[test]
    fn test_merge_is_monotone() {
        let mut persisted = map(r#"{"h1":{"class_names":["a"],"urls":["u1","u2"]}}"#);
        persisted.merge(map(r#"{"h1":{"class_names":["a"],"urls":["u2"]},"h2":{"class_names":["b"],"urls":["u3"]}}"#));
        let entry = persisted.get("h1").unwrap();
        assert_eq!(entry.urls.iter().collect::<Vec<_>>(), ["u1", "u2"]);
        assert_eq!(persisted.iter().map(|(h, _)| h.as_str()).collect::<Vec<_>>(), ["h1", "h2"]);
    }

    #[test]
    fn test_absorb_keeps_existing_class_names() {
        let mut run = map(r#"{"h1":{"class_names":["a"],"urls":["u1"]}}"#);
        run.absorb(map(r#"{"h1":{"class_names":["A"],"urls":["u2"]}}"#));
        assert_eq!(run, map(r#"{"h1":{"class_names":["a"],"urls":["u1","u2"]}}"#));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let json = r#"{"zz":{"class_names":["z"],"urls":[]},"aa":{"class_names":["a"],"urls":[]}}"#;
        assert_eq!(serde_json::to_string(&map(json)).unwrap(), json);
    }

    #[test]
    fn test_urls() {
        let block_map = map(r#"{"h1":{"class_names":["a"],"urls":["u1","u2"]},"h2":{"class_names":["b"],"urls":["u2","u3"]}}"#);
        assert_eq!(block_map.urls().collect::<Vec<_>>(), ["u1", "u2", "u3"]);
    }
}
