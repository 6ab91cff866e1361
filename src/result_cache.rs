//! Process-wide memoization of search results.
//!
//! Entries are keyed by the lower-cased query and live for the lifetime of the
//! process. There is no eviction: a picker session sees a handful to a few
//! hundred distinct queries.
//!
//! Concurrent writers for the same key always carry the same value, so a race
//! only duplicates the upstream work.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tokio::sync::RwLock;

use crate::types::PostalRecord;

static GLOBAL: LazyLock<ResultCache> = LazyLock::new(ResultCache::new);

/// Shared, append-only cache of search results.
///
/// Clones share the same storage.
///
/// # Example
///
/// ```
/// use postcode_picker::{PostalRecord, ResultCache};
///
/// #[tokio::main]
/// async fn main() {
///     let cache = ResultCache::new();
///     cache.put("Leu", vec![PostalRecord::new("3000", "Leuven")]).await;
///
///     assert!(cache.get("LEU").await.is_some());
/// }
/// ```
#[derive(Clone, Default)]
pub struct ResultCache {
    inner: Arc<RwLock<HashMap<String, Vec<PostalRecord>>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance shared by every caller in this process.
    pub fn global() -> &'static ResultCache {
        &GLOBAL
    }

    /// Key is the query lower-cased verbatim, no trimming.
    pub fn key(query: &str) -> String {
        query.to_lowercase()
    }

    pub async fn get(&self, query: &str) -> Option<Vec<PostalRecord>> {
        let cache = self.inner.read().await;
        cache.get(&Self::key(query)).cloned()
    }

    pub async fn put(&self, query: &str, results: Vec<PostalRecord>) {
        let mut cache = self.inner.write().await;
        cache.insert(Self::key(query), results);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
