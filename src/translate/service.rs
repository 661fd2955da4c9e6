//! Cached, single-flight front for a [`Translator`].
//!
//! # Request flow
//!
//! ```text
//! translate(req)
//!   ├─ cache hit                → return cached result (no network)
//!   ├─ fetch already in flight  → subscribe to its broadcast, await outcome
//!   └─ otherwise                → register in-flight marker, call translator
//!                                   ├─ Ok  → insert into cache, broadcast Ok
//!                                   └─ Err → broadcast Err (nothing cached)
//!                                 marker removed in both cases
//! ```
//!
//! The state mutex is only held for map bookkeeping, never across an
//! `.await`.  If the caller that owns a fetch is dropped mid-flight, its
//! marker is removed on drop and any waiters start a fresh fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::translate::cache::{CachePolicy, CacheStats, TranslationCache};
use crate::translate::client::Translator;
use crate::translate::error::TranslateError;
use crate::translate::request::{TranslationRequest, TranslationResult};

type Outcome = Result<TranslationResult, TranslateError>;

struct ServiceState {
    cache: TranslationCache,
    in_flight: HashMap<TranslationRequest, broadcast::Sender<Outcome>>,
}

/// Translation cache and client, shared by every lane and pipeline instance.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    state: Mutex<ServiceState>,
}

enum Role {
    Leader,
    Waiter(broadcast::Receiver<Outcome>),
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>, policy: CachePolicy) -> Self {
        Self {
            translator,
            state: Mutex::new(ServiceState {
                cache: TranslationCache::new(policy),
                in_flight: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Translate `request`, serving from cache when possible.
    ///
    /// Concurrent calls for the same request share one outbound call and all
    /// observe the same result or the same error.  Failures are never cached,
    /// so the next call after an error tries the endpoint again.
    pub async fn translate(&self, request: &TranslationRequest) -> Outcome {
        loop {
            let role = {
                let mut state = self.lock();
                if let Some(hit) = state.cache.get(request) {
                    return Ok(hit);
                }
                match state.in_flight.get(request) {
                    Some(tx) => {
                        let rx = tx.subscribe();
                        state.cache.record_coalesced();
                        Role::Waiter(rx)
                    }
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        state.in_flight.insert(request.clone(), tx);
                        Role::Leader
                    }
                }
            };

            match role {
                Role::Leader => return self.fetch(request).await,
                Role::Waiter(mut rx) => match rx.recv().await {
                    Ok(outcome) => return outcome,
                    // The owning caller was dropped before finishing; its
                    // marker is gone, so go round again.
                    Err(_) => {
                        log::debug!(
                            "translate: in-flight fetch for {:?} abandoned, retrying",
                            request.source_text()
                        );
                    }
                },
            }
        }
    }

    async fn fetch(&self, request: &TranslationRequest) -> Outcome {
        let flight = Flight {
            state: &self.state,
            key: Some(request.clone()),
        };

        log::debug!(
            "translate: fetching {:?} ({} -> {})",
            request.source_text(),
            request.source_lang(),
            request.target_lang()
        );

        let outcome = self
            .translator
            .translate(request)
            .await
            .map(|text| TranslationResult::new(request.clone(), text));

        flight.land(outcome)
    }

    /// Detect the language of `text`.  Passed straight to the translator:
    /// detection results are not cached and not coalesced.
    pub async fn detect_language(&self, text: &str) -> Result<String, TranslateError> {
        self.translator.detect_language(text.trim()).await
    }

    /// Cached result for `request`, if any, without touching the network.
    pub fn cached(&self, request: &TranslationRequest) -> Option<TranslationResult> {
        self.lock().cache.get(request)
    }

    pub fn cache_len(&self) -> usize {
        self.lock().cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock().cache.stats()
    }

    /// Number of distinct requests currently being fetched.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }
}

/// In-flight marker owned by the fetching caller.
///
/// [`land`](Flight::land) publishes the outcome; dropping the flight without
/// landing (task cancelled) just removes the marker so it cannot block
/// future callers.
struct Flight<'a> {
    state: &'a Mutex<ServiceState>,
    key: Option<TranslationRequest>,
}

impl Flight<'_> {
    fn land(mut self, outcome: Outcome) -> Outcome {
        let Some(key) = self.key.take() else {
            return outcome;
        };
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let outcome = match outcome {
            Ok(result) => Ok(state.cache.insert(result)),
            Err(err) => {
                log::debug!("translate: fetch for {:?} failed: {err}", key.source_text());
                Err(err)
            }
        };

        if let Some(tx) = state.in_flight.remove(&key) {
            // No receivers just means nobody else was waiting.
            let _ = tx.send(outcome.clone());
        }
        outcome
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&key);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Counts calls; answers `"<text>!"` after `delay`, or fails with `error`.
    struct CountingTranslator {
        calls: AtomicUsize,
        detect_calls: AtomicUsize,
        delay: Duration,
        error: Option<TranslateError>,
    }

    impl CountingTranslator {
        fn ok(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                detect_calls: AtomicUsize::new(0),
                delay,
                error: None,
            }
        }

        fn failing(delay: Duration, error: TranslateError) -> Self {
            Self {
                error: Some(error),
                ..Self::ok(delay)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.error {
                Some(err) => Err(err.clone()),
                None => Ok(format!("{}!", request.source_text())),
            }
        }

        async fn detect_language(&self, _text: &str) -> Result<String, TranslateError> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            Ok("fr".into())
        }
    }

    /// First call never completes; later calls succeed immediately.
    struct HangsOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for HangsOnce {
        async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslateError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(request.source_text().to_uppercase())
        }

        async fn detect_language(&self, _text: &str) -> Result<String, TranslateError> {
            Ok("en".into())
        }
    }

    fn hello() -> TranslationRequest {
        TranslationRequest::new("Hello", "en", "es")
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_identical_requests_make_one_call() {
        let translator = Arc::new(CountingTranslator::ok(Duration::from_millis(50)));
        let service = Arc::new(TranslationService::new(
            translator.clone(),
            CachePolicy::Unbounded,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.translate(&hello()).await })
            })
            .collect();

        let mut texts = Vec::new();
        for handle in handles {
            texts.push(handle.await.expect("join").expect("translate").translated_text);
        }

        assert_eq!(translator.calls(), 1);
        assert!(texts.iter().all(|t| t == "Hello!"));
        assert_eq!(service.in_flight(), 0);
        assert_eq!(service.cache_len(), 1);
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_error_and_are_not_cached() {
        let error = TranslateError::Service {
            status: 500,
            message: "backend down".into(),
        };
        let translator = Arc::new(CountingTranslator::failing(
            Duration::from_millis(50),
            error.clone(),
        ));
        let service = Arc::new(TranslationService::new(
            translator.clone(),
            CachePolicy::Unbounded,
        ));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.translate(&hello()).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.expect("join").unwrap_err(), error);
        }
        assert_eq!(translator.calls(), 1);
        assert_eq!(service.cache_len(), 0);
        assert_eq!(service.in_flight(), 0);

        // Marker was cleared, so the next call goes to the network again.
        assert!(service.translate(&hello()).await.is_err());
        assert_eq!(translator.calls(), 2);
    }

    #[tokio::test]
    async fn sequential_calls_hit_cache() {
        let translator = Arc::new(CountingTranslator::ok(Duration::ZERO));
        let service = TranslationService::new(translator.clone(), CachePolicy::Unbounded);

        let first = service.translate(&hello()).await.expect("first");
        let second = service.translate(&hello()).await.expect("second");

        assert_eq!(translator.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(service.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn whitespace_variants_share_an_entry() {
        let translator = Arc::new(CountingTranslator::ok(Duration::ZERO));
        let service = TranslationService::new(translator.clone(), CachePolicy::Unbounded);

        service.translate(&hello()).await.expect("first");
        service
            .translate(&TranslationRequest::new("  Hello\t", "en", "es"))
            .await
            .expect("second");

        assert_eq!(translator.calls(), 1);
    }

    #[tokio::test]
    async fn other_language_pair_is_fetched_fresh() {
        let translator = Arc::new(CountingTranslator::ok(Duration::ZERO));
        let service = TranslationService::new(translator.clone(), CachePolicy::Unbounded);

        service
            .translate(&TranslationRequest::new("Hola", "es", "en"))
            .await
            .expect("es -> en");
        let result = service
            .translate(&TranslationRequest::new("Hola", "en", "es"))
            .await
            .expect("en -> es");

        assert_eq!(translator.calls(), 2);
        assert_eq!(result.request.target_lang(), "es");
    }

    #[tokio::test]
    async fn lru_policy_refetches_evicted_entries() {
        let translator = Arc::new(CountingTranslator::ok(Duration::ZERO));
        let service =
            TranslationService::new(translator.clone(), CachePolicy::Lru { capacity: 1 });

        service.translate(&hello()).await.expect("hello");
        service
            .translate(&TranslationRequest::new("Bye", "en", "es"))
            .await
            .expect("bye");
        service.translate(&hello()).await.expect("hello again");

        assert_eq!(translator.calls(), 3);
        assert_eq!(service.cache_len(), 1);
        assert_eq!(service.cache_stats().evictions, 2);
    }

    #[tokio::test]
    async fn cancelled_leader_does_not_block_later_callers() {
        let translator = Arc::new(HangsOnce {
            calls: AtomicUsize::new(0),
        });
        let service = Arc::new(TranslationService::new(
            translator.clone(),
            CachePolicy::Unbounded,
        ));

        let leader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.translate(&hello()).await })
        };

        while translator.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(service.in_flight(), 1);

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());
        assert_eq!(service.in_flight(), 0);

        let result = service.translate(&hello()).await.expect("retry");
        assert_eq!(result.translated_text, "HELLO");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waiters_retry_when_leader_is_cancelled() {
        let translator = Arc::new(HangsOnce {
            calls: AtomicUsize::new(0),
        });
        let service = Arc::new(TranslationService::new(
            translator.clone(),
            CachePolicy::Unbounded,
        ));

        let leader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.translate(&hello()).await })
        };
        while translator.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let waiter = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.translate(&hello()).await })
        };
        while service.cache_stats().coalesced == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        leader.abort();
        let result = waiter.await.expect("join").expect("translate");
        assert_eq!(result.translated_text, "HELLO");
    }

    #[tokio::test]
    async fn detect_language_is_never_cached() {
        let translator = Arc::new(CountingTranslator::ok(Duration::ZERO));
        let service = TranslationService::new(translator.clone(), CachePolicy::Unbounded);

        assert_eq!(service.detect_language("Bonjour").await.expect("detect"), "fr");
        assert_eq!(service.detect_language("Bonjour").await.expect("detect"), "fr");

        assert_eq!(translator.detect_calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache_len(), 0);
    }
}
