use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::lookup::LookupResult;
use crate::query::Query;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(n) => n,
    None => unreachable!(),
};

/// Last successful result per query. Cloning shares the same storage.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Mutex<LruCache<Query, LookupResult>>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        ResultCache {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Reading does not promote the entry; rendering the history list should not
    /// reshuffle eviction order.
    pub fn get(&self, query: &Query) -> Option<LookupResult> {
        match self.inner.lock() {
            Ok(cache) => cache.peek(query).cloned(),
            Err(_) => None,
        }
    }

    pub fn put(&self, query: Query, result: LookupResult) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(query, result);
        } else {
            tracing::warn!("result cache lock poisoned, dropping entry for {}", query);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").field("len", &self.len()).finish()
    }
}
