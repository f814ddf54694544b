//! Cached, de-duplicated loading of shared transcripts.
//!
//! Concurrent requests for the same share id share one in-flight read.
//! Successful reads are cached; failures are not, so the next request
//! retries.

use duet_core::config::SyncSettings;
use duet_core::error::Result;
use duet_core::shared::{SharedTranscript, SharedTranscriptSource};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

type PendingFetch = Shared<BoxFuture<'static, Result<Arc<SharedTranscript>>>>;

/// Bounds on the transcript cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Oldest entries are evicted past this count; `None` is unbounded
    pub max_entries: Option<usize>,
    /// Entries older than this are refetched; `None` never expires
    pub ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_entries: Some(64),
            ttl: None,
        }
    }
}

impl CachePolicy {
    /// Policy configured by the `[sync]` section.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            max_entries: settings.shared_cache_max_entries,
            ttl: settings.shared_cache_ttl(),
        }
    }
}

struct CacheEntry {
    transcript: Arc<SharedTranscript>,
    stored_at: Instant,
}

#[derive(Default)]
struct FetcherInner {
    cache: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
    pending: HashMap<String, PendingFetch>,
}

impl FetcherInner {
    fn cached(&mut self, share_id: &str, policy: &CachePolicy) -> Option<Arc<SharedTranscript>> {
        let entry = self.cache.get(share_id)?;
        let expired = policy
            .ttl
            .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl);
        if expired {
            self.remove(share_id);
            return None;
        }
        Some(entry.transcript.clone())
    }

    fn insert(&mut self, share_id: String, transcript: Arc<SharedTranscript>, policy: &CachePolicy) {
        self.order.retain(|id| id != &share_id);
        self.order.push_back(share_id.clone());
        self.cache.insert(
            share_id,
            CacheEntry {
                transcript,
                stored_at: Instant::now(),
            },
        );

        if let Some(max) = policy.max_entries {
            while self.cache.len() > max {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.cache.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, share_id: &str) {
        self.cache.remove(share_id);
        self.order.retain(|id| id != share_id);
    }
}

/// Loads shared transcripts through a [`SharedTranscriptSource`].
pub struct SharedTranscriptFetcher {
    source: Arc<dyn SharedTranscriptSource>,
    policy: CachePolicy,
    inner: Arc<Mutex<FetcherInner>>,
}

impl SharedTranscriptFetcher {
    pub fn new(source: Arc<dyn SharedTranscriptSource>, policy: CachePolicy) -> Self {
        Self {
            source,
            policy,
            inner: Arc::new(Mutex::new(FetcherInner::default())),
        }
    }

    /// Returns the transcript for `share_id`, from cache when possible.
    pub async fn fetch(&self, share_id: &str) -> Result<Arc<SharedTranscript>> {
        let pending = {
            let mut inner = self.lock();
            if let Some(hit) = inner.cached(share_id, &self.policy) {
                tracing::debug!("[SharedTranscriptFetcher] Cache hit for {}", share_id);
                return Ok(hit);
            }
            match inner.pending.get(share_id) {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.spawn_fetch(share_id);
                    inner.pending.insert(share_id.to_string(), pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    fn spawn_fetch(&self, share_id: &str) -> PendingFetch {
        let source = Arc::clone(&self.source);
        let inner = Arc::clone(&self.inner);
        let policy = self.policy;
        let share_id = share_id.to_string();

        async move {
            tracing::debug!("[SharedTranscriptFetcher] Fetching {}", share_id);
            let result = source.fetch_shared(&share_id).await.map(Arc::new);

            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.pending.remove(&share_id);
            match &result {
                Ok(transcript) => inner.insert(share_id, transcript.clone(), &policy),
                Err(e) => tracing::warn!("[SharedTranscriptFetcher] Fetch of {} failed: {}", share_id, e),
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Drops the cached copy of `share_id`.
    pub fn invalidate(&self, share_id: &str) {
        self.lock().remove(share_id);
    }

    pub fn cached_len(&self) -> usize {
        self.lock().cache.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FetcherInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use duet_core::error::DuetError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SharedTranscriptSource for CountingSource {
        async fn fetch_shared(&self, share_id: &str) -> Result<SharedTranscript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(DuetError::sync("network down"));
            }
            Ok(SharedTranscript {
                topic: format!("topic of {share_id}"),
                messages: Vec::new(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_read() {
        let source = CountingSource::new(Duration::from_millis(200));
        let fetcher = SharedTranscriptFetcher::new(source.clone(), CachePolicy::default());

        let (first, second) = tokio::join!(fetcher.fetch("abc"), fetcher.fetch("abc"));

        assert_eq!(source.calls(), 1);
        assert_eq!(first.unwrap().topic, "topic of abc");
        assert_eq!(second.unwrap().topic, "topic of abc");

        fetcher.fetch("abc").await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_not_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
            fail: true,
        });
        let fetcher = SharedTranscriptFetcher::new(source.clone(), CachePolicy::default());

        assert!(fetcher.fetch("abc").await.unwrap_err().is_sync());
        assert!(fetcher.fetch("abc").await.is_err());
        assert_eq!(source.calls(), 2);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oldest_entry_is_evicted() {
        let source = CountingSource::new(Duration::ZERO);
        let policy = CachePolicy {
            max_entries: Some(2),
            ttl: None,
        };
        let fetcher = SharedTranscriptFetcher::new(source.clone(), policy);

        for id in ["a", "b", "c"] {
            fetcher.fetch(id).await.unwrap();
        }
        assert_eq!(fetcher.cached_len(), 2);

        fetcher.fetch("a").await.unwrap();
        assert_eq!(source.calls(), 4);
        fetcher.fetch("c").await.unwrap();
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let source = CountingSource::new(Duration::ZERO);
        let policy = CachePolicy {
            max_entries: None,
            ttl: Some(Duration::from_secs(60)),
        };
        let fetcher = SharedTranscriptFetcher::new(source.clone(), policy);

        fetcher.fetch("abc").await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        fetcher.fetch("abc").await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        fetcher.fetch("abc").await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = CountingSource::new(Duration::ZERO);
        let fetcher = SharedTranscriptFetcher::new(source.clone(), CachePolicy::default());

        fetcher.fetch("abc").await.unwrap();
        fetcher.invalidate("abc");
        fetcher.fetch("abc").await.unwrap();
        assert_eq!(source.calls(), 2);
    }
}
