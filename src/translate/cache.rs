//! Translation result cache.
//!
//! Entries are keyed by [`TranslationRequest`] and never change once stored:
//! a second insert for a key that is already present keeps the first value.
//! Growth is governed by [`CachePolicy`]; with `Lru { capacity }` the least
//! recently used entry is evicted when a new key arrives at capacity.
//!
//! The cache itself is not synchronised.  [`TranslationService`] owns it
//! behind a mutex together with the in-flight table.
//!
//! [`TranslationService`]: crate::translate::TranslationService

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::translate::request::{TranslationRequest, TranslationResult};

/// Eviction policy for [`TranslationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every entry for the lifetime of the process.
    #[default]
    Unbounded,
    /// Keep at most `capacity` entries, evicting the least recently used.
    Lru { capacity: usize },
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that attached to an already running fetch instead of issuing
    /// their own.
    pub coalesced: u64,
    pub evictions: u64,
}

pub struct TranslationCache {
    entries: LruCache<TranslationRequest, TranslationResult>,
    stats: CacheStats,
}

impl TranslationCache {
    pub fn new(policy: CachePolicy) -> Self {
        let entries = match policy {
            CachePolicy::Lru { capacity } => match NonZeroUsize::new(capacity) {
                Some(capacity) => LruCache::new(capacity),
                None => LruCache::unbounded(),
            },
            CachePolicy::Unbounded => LruCache::unbounded(),
        };

        Self {
            entries,
            stats: CacheStats::default(),
        }
    }

    /// Look up `request`, marking it as most recently used on a hit.
    pub fn get(&mut self, request: &TranslationRequest) -> Option<TranslationResult> {
        match self.entries.get(request) {
            Some(result) => {
                self.stats.hits += 1;
                Some(result.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store `result` under its request and return the value the cache now
    /// holds for that key.
    ///
    /// If the key is already present the existing entry wins and `result` is
    /// discarded.
    pub fn insert(&mut self, result: TranslationResult) -> TranslationResult {
        if let Some(existing) = self.entries.get(&result.request) {
            return existing.clone();
        }

        let key = result.request.clone();
        if let Some((evicted, _)) = self.entries.push(key, result.clone()) {
            // `push` only returns a pair for a new key when it evicted one.
            log::debug!(
                "translate: cache evicted {:?} ({} -> {})",
                evicted.source_text(),
                evicted.source_lang(),
                evicted.target_lang()
            );
            self.stats.evictions += 1;
        }
        result
    }

    pub(crate) fn record_coalesced(&mut self) {
        self.stats.coalesced += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
