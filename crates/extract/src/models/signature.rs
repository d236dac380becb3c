use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Class-name tokens observed on one candidate element, in document order.
///
/// Tokens are neither deduplicated nor case-normalized at capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClassSignature(Vec<String>);
impl ClassSignature {
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Splits a raw `class` attribute value on whitespace.
    pub fn from_attribute(value: &str) -> Self {
        Self::new(value.split_whitespace())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if any token marks a layout wrapper.
    pub fn is_wrapper(&self) -> bool {
        self.0.iter().any(|class| class.ends_with(crate::consts::WRAPPER_SUFFIX))
    }

    pub fn hash(&self) -> SignatureHash {
        SignatureHash::of(&self.0)
    }
}

/// Content address of a [`ClassSignature`].
///
/// Lowercase hex SHA-256 of the tokens sorted ascending and joined by single
/// spaces. Token order does not matter, case does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureHash(String);
impl SignatureHash {
    pub fn of(tokens: &[impl AsRef<str>]) -> Self {
        let mut sorted: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();
        let digest = Sha256::digest(sorted.join(" ").as_bytes());
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for SignatureHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl From<&str> for SignatureHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
impl Borrow<str> for SignatureHash {
    fn borrow(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for SignatureHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl Display for SignatureHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
