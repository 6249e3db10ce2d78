//! Response caching keyed by URL.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Storage for raw response bodies.
pub trait Cache: Send + Sync {
    /// Previously stored body for `url`, if any.
    fn get(&self, url: &str) -> Option<Vec<u8>>;

    /// Remember the body fetched from `url`.
    fn insert(&self, url: &str, bytes: &[u8]);
}

/// Cache that never stores anything; every lookup goes to the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }

    fn insert(&self, _url: &str, _bytes: &[u8]) {}
}

/// Unbounded in-memory cache; entries never expire.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached responses.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn insert(&self, url: &str, bytes: &[u8]) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned(), bytes.to_vec());
    }
}
