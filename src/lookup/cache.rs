use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::lookup::rate_limit::{RateLimiter, DEFAULT_COOLDOWN};
use crate::lookup::{LookupError, SeriesInfo, SeriesLookup};
use crate::utils::validation::normalize_text;

/// Cache key: (provider id, normalized title, normalized author)
type CacheKey = (&'static str, String, String);

/// Counters for one cached lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Requests actually sent to the provider
    pub requests: usize,
    pub cache_hits: usize,
    /// Lookups skipped because the provider was cooling down
    pub cooldown_skips: usize,
    /// Lookups that ended in a provider error
    pub failures: usize,
}

/// A provider wrapped with its outcome cache and rate limiter.
///
/// Every call resolves to `Option<SeriesInfo>`; provider errors are logged and
/// degrade to `None`. The cooldown gate is checked before the cache, and
/// lookups refused by the cooldown, rate-limit signals and transport errors
/// are never cached, so they can be retried later. Definitive answers
/// (series found, no series, malformed answer) are cached for the lifetime
/// of this object.
///
/// The cache is not locked across a request: concurrent callers that miss on
/// the same key may each reach the provider. Request spacing still applies to
/// every one of them.
#[derive(Debug)]
pub struct CachedLookup<P> {
    provider: P,
    limiter: RateLimiter,
    cache: Mutex<HashMap<CacheKey, Option<SeriesInfo>>>,
    requests: AtomicUsize,
    cache_hits: AtomicUsize,
    cooldown_skips: AtomicUsize,
    failures: AtomicUsize,
}

impl<P: SeriesLookup> CachedLookup<P> {
    /// Wrap a provider using its default request spacing and cooldown
    pub fn new(provider: P) -> Self {
        let interval = provider.kind().default_min_interval();
        Self::with_limits(provider, interval, DEFAULT_COOLDOWN)
    }

    pub fn with_limits(provider: P, min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            provider,
            limiter: RateLimiter::new(min_interval, cooldown),
            cache: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            cooldown_skips: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cooldown_skips: self.cooldown_skips.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Number of cached outcomes, positive and negative
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Look up the series for a title, degrading every failure to `None`
    pub fn lookup(&self, title: &str, author: Option<&str>) -> Option<SeriesInfo> {
        let kind = self.provider.kind();

        if let Some(remaining) = self.limiter.cooldown_remaining() {
            self.cooldown_skips.fetch_add(1, Ordering::Relaxed);
            warn!(
                provider = %kind,
                title = %title,
                "Skipping lookup - rate limited for another {:.1}s",
                remaining.as_secs_f64()
            );
            return None;
        }

        let key: CacheKey = (
            kind.id(),
            normalize_text(title),
            normalize_text(author.unwrap_or_default()),
        );

        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(provider = %kind, title = %title, "Lookup cache hit");
            return cached.clone();
        }

        self.limiter.wait();
        self.requests.fetch_add(1, Ordering::Relaxed);

        let outcome = match self.provider.lookup(title, author) {
            Ok(answer) => {
                if let Some(info) = &answer {
                    info!(provider = %kind, title = %title, series = %info.name, "Found series");
                }
                Some(answer)
            }
            Err(LookupError::RateLimited) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.limiter.trip();
                warn!(provider = %kind, "Rate limit hit - backing off");
                None
            }
            Err(err @ LookupError::Malformed(_)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(provider = %kind, title = %title, error = %err, "Treating unusable answer as no series");
                Some(None)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(provider = %kind, title = %title, error = %err, "Lookup failed");
                None
            }
        };

        match outcome {
            Some(answer) => {
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, answer.clone());
                answer
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use crate::lookup::ProviderKind;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Provider returning scripted results and counting calls
    struct ScriptedLookup {
        responses: RefCell<VecDeque<Result<Option<SeriesInfo>, LookupError>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedLookup {
        fn new(responses: Vec<Result<Option<SeriesInfo>, LookupError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl SeriesLookup for ScriptedLookup {
        fn kind(&self) -> ProviderKind {
            ProviderKind::BibliographicCatalog
        }

        fn lookup(&self, _: &str, _: Option<&str>) -> Result<Option<SeriesInfo>, LookupError> {
            *self.calls.borrow_mut() += 1;
            self.responses.borrow_mut().pop_front().unwrap_or(Ok(None))
        }
    }

    fn alex_rider() -> SeriesInfo {
        SeriesInfo {
            name: "Alex Rider".to_string(),
            position: Some(Position::Number("1".to_string())),
        }
    }

    fn cached(responses: Vec<Result<Option<SeriesInfo>, LookupError>>) -> CachedLookup<ScriptedLookup> {
        CachedLookup::with_limits(
            ScriptedLookup::new(responses),
            Duration::ZERO,
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_positive_result_is_cached() {
        let lookup = cached(vec![Ok(Some(alex_rider()))]);

        assert_eq!(lookup.lookup("Stormbreaker", Some("Anthony Horowitz")), Some(alex_rider()));
        // Normalized key: case and spacing differences hit the same entry
        assert_eq!(
            lookup.lookup("  STORMBREAKER ", Some("anthony   horowitz")),
            Some(alex_rider())
        );

        assert_eq!(lookup.provider().calls(), 1);
        assert_eq!(lookup.stats().cache_hits, 1);
    }

    #[test]
    fn test_negative_result_is_cached() {
        let lookup = cached(vec![Ok(None), Ok(Some(alex_rider()))]);

        assert_eq!(lookup.lookup("The Stand", None), None);
        assert_eq!(lookup.lookup("The Stand", None), None);
        assert_eq!(lookup.provider().calls(), 1);
        assert_eq!(lookup.cached_len(), 1);
    }

    #[test]
    fn test_author_is_part_of_key() {
        let lookup = cached(vec![Ok(None), Ok(Some(alex_rider()))]);

        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.lookup("Stormbreaker", Some("Anthony Horowitz")), Some(alex_rider()));
        assert_eq!(lookup.provider().calls(), 2);
    }

    #[test]
    fn test_rate_limit_enters_cooldown_without_requests() {
        let lookup = cached(vec![Err(LookupError::RateLimited), Ok(Some(alex_rider()))]);

        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.lookup("Point Blanc", None), None);

        assert_eq!(lookup.provider().calls(), 1);
        let stats = lookup.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.cooldown_skips, 2);
        // Nothing cached for rate-limited keys
        assert_eq!(lookup.cached_len(), 0);
    }

    #[test]
    fn test_retry_after_cooldown_expires() {
        let lookup = CachedLookup::with_limits(
            ScriptedLookup::new(vec![Err(LookupError::RateLimited), Ok(Some(alex_rider()))]),
            Duration::ZERO,
            Duration::from_millis(20),
        );

        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(lookup.lookup("Stormbreaker", None), Some(alex_rider()));
        assert_eq!(lookup.provider().calls(), 2);
    }

    #[test]
    fn test_cooldown_gate_precedes_cache() {
        let lookup = cached(vec![Ok(Some(alex_rider())), Err(LookupError::RateLimited)]);

        assert_eq!(lookup.lookup("Stormbreaker", None), Some(alex_rider()));
        assert_eq!(lookup.lookup("Point Blanc", None), None);
        // Cached answer is not served while cooling down
        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.stats().cooldown_skips, 1);
    }

    #[test]
    fn test_malformed_is_cached_as_no_series() {
        let lookup = cached(vec![
            Err(LookupError::Malformed("not json".to_string())),
            Ok(Some(alex_rider())),
        ]);

        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.provider().calls(), 1);
    }

    /// Thread-safe provider that counts calls and never finds a series
    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl SeriesLookup for CountingLookup {
        fn kind(&self) -> ProviderKind {
            ProviderKind::BibliographicCatalog
        }

        fn lookup(&self, _: &str, _: Option<&str>) -> Result<Option<SeriesInfo>, LookupError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(None)
        }
    }

    #[test]
    fn test_concurrent_misses_are_spaced() {
        let lookup = CachedLookup::with_limits(
            CountingLookup::default(),
            Duration::from_millis(30),
            Duration::from_secs(60),
        );
        let start = std::time::Instant::now();
        std::thread::scope(|scope| {
            for title in ["Stormbreaker", "Point Blanc", "Skeleton Key"] {
                let lookup = &lookup;
                scope.spawn(move || lookup.lookup(title, None));
            }
        });

        assert_eq!(lookup.provider().calls.load(Ordering::Relaxed), 3);
        assert_eq!(lookup.stats().requests, 3);
        assert_eq!(lookup.cached_len(), 3);
        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[test]
    fn test_network_error_is_not_cached() {
        let lookup = cached(vec![
            Err(LookupError::Network("connection reset".to_string())),
            Ok(Some(alex_rider())),
        ]);

        assert_eq!(lookup.lookup("Stormbreaker", None), None);
        assert_eq!(lookup.lookup("Stormbreaker", None), Some(alex_rider()));
        assert_eq!(lookup.stats().failures, 1);
    }
}
