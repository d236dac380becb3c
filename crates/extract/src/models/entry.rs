use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Everything known about one class signature: its class names and every page
/// it was seen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMapEntry {
    /// Class names as last observed; replaced (not unioned) on merge.
    #[serde(default)]
    pub class_names: Vec<String>,
    /// Pages the signature appeared on, in first-seen order.
    #[serde(default)]
    pub urls: IndexSet<String>,
}
impl BlockMapEntry {
    pub fn new(class_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            class_names: class_names.into_iter().map(Into::into).collect(),
            urls: IndexSet::new(),
        }
    }

    pub fn with_urls(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Records a page URL; returns `false` if it was already present.
    pub fn add_url(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Class names trimmed, lowercased, with empties dropped.
    ///
    /// Matching is case-insensitive even though hashing is not.
    pub fn normalized_classes(&self) -> impl Iterator<Item = String> + '_ {
        self.class_names.iter().map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty())
    }
}
