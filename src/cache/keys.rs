//! Cache key derivation.
//!
//! Entries are keyed by the normalized request path under a `cache:`
//! namespace, so the collection view and each item view invalidate
//! independently.

use std::fmt;

const KEY_NAMESPACE: &str = "cache:";

/// A normalized cache key derived from a request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request path: `"cache:" + path`.
    pub fn from_path(path: &str) -> Self {
        Self(format!("{KEY_NAMESPACE}{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys that can hold a stale collection view after any sample mutation.
///
/// Both the bare and trailing-slash spellings of the collection path are
/// routable, so both must be purged.
pub fn sample_collection_keys() -> Vec<CacheKey> {
    vec![
        CacheKey::from_path("/samples"),
        CacheKey::from_path("/samples/"),
    ]
}

/// Key for a single sample's item view.
pub fn sample_item_key(id: i64) -> CacheKey {
    CacheKey::from_path(&format!("/samples/{id}"))
}

/// All keys a mutation of `id` can leave stale: the collection views plus the
/// item view.
pub fn sample_mutation_keys(id: i64) -> Vec<CacheKey> {
    let mut keys = sample_collection_keys();
    keys.push(sample_item_key(id));
    keys
}
