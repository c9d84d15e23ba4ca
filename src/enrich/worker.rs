//! Background enrichment worker.
//!
//! Exactly one worker task drains the request queue per session. Each
//! request resolves through the identity directory unless a prior
//! resolution already satisfied the cache for that number. Change
//! notifications are coalesced: one per drain cycle, emitted when the
//! queue runs dry, not one per resolved row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ExpiringCache;
use crate::events::{ChangeListeners, FeedEvent};
use crate::number;
use crate::store::IdentityResolver;
use crate::types::{ContactInfo, EnrichmentRequest};

use super::queue::RequestQueue;

/// State shared between the coordinator, the worker task and the feed.
pub(crate) struct EnrichShared {
    pub queue: RequestQueue,
    pub cache: Arc<ExpiringCache<String, ContactInfo>>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub listeners: Arc<ChangeListeners>,
    /// How long the idle worker sleeps before re-checking its queue and
    /// shutdown flag.
    pub idle_wait: Duration,
}

/// Drain loop for one worker session.
///
/// Runs until `done` is set. In-flight lookups are abandoned rather than
/// cancelled on shutdown; their late cache write is harmless (same key,
/// same or newer data).
pub(crate) async fn run_worker(shared: Arc<EnrichShared>, done: Arc<AtomicBool>) {
    log::info!("enrichment worker: started");
    let mut dirty = false;

    while !done.load(Ordering::SeqCst) {
        match shared.queue.pop() {
            Some(request) => {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                if resolve_request(&shared, &request).await {
                    dirty = true;
                }
            }
            None => {
                if dirty {
                    dirty = false;
                    shared.listeners.emit(FeedEvent::DataChanged);
                }
                shared.queue.idle_wait(shared.idle_wait).await;
            }
        }
    }

    log::info!("enrichment worker: stopped");
}

/// Resolve one request against the directory. Returns whether the cache
/// value for the number actually changed.
async fn resolve_request(shared: &EnrichShared, request: &EnrichmentRequest) -> bool {
    // A prior request for the same number may already have been satisfied;
    // one real lookup per key is enough even if duplicates were queued.
    if let Some(info) = shared.cache.get(&request.number) {
        if !info.is_empty() {
            return false;
        }
    }

    let looked_up = if number::is_uri_address(&request.number) {
        shared.resolver.lookup_uri_address(&request.number).await
    } else {
        shared.resolver.lookup_number(&request.number).await
    };

    let resolved = match looked_up {
        Ok(found) => found,
        Err(e) => {
            // Treated as "no match" for this request; never fatal to the loop
            log::warn!(
                "enrichment worker: lookup failed for row {} ({}): {}",
                request.position,
                request.number,
                e
            );
            None
        }
    };

    let value = match resolved {
        Some(mut info) => {
            // Formatting happens lazily on first display
            info.formatted_number = None;
            info
        }
        None => ContactInfo::EMPTY,
    };

    let changed = shared.cache.get_possibly_expired(&request.number).as_ref() != Some(&value);
    shared.cache.put(request.number.clone(), value);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Directory fake counting lookups per channel.
    #[derive(Default)]
    struct FakeDirectory {
        entries: Mutex<HashMap<String, ContactInfo>>,
        number_lookups: AtomicUsize,
        uri_lookups: AtomicUsize,
        fail: AtomicBool,
    }

    impl FakeDirectory {
        fn with_entry(number: &str, name: &str) -> Self {
            let dir = FakeDirectory::default();
            dir.entries.lock().insert(
                number.to_string(),
                ContactInfo {
                    contact_id: 1,
                    name: Some(name.to_string()),
                    ..ContactInfo::EMPTY
                },
            );
            dir
        }
    }

    #[async_trait]
    impl IdentityResolver for FakeDirectory {
        async fn lookup_number(&self, num: &str) -> Result<Option<ContactInfo>, StoreError> {
            self.number_lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("directory offline".into()));
            }
            Ok(self.entries.lock().get(num).cloned())
        }

        async fn lookup_uri_address(&self, addr: &str) -> Result<Option<ContactInfo>, StoreError> {
            self.uri_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().get(addr).cloned())
        }
    }

    fn make_shared(resolver: Arc<FakeDirectory>) -> Arc<EnrichShared> {
        let _ = env_logger::builder().is_test(true).try_init();
        Arc::new(EnrichShared {
            queue: RequestQueue::new(),
            cache: Arc::new(ExpiringCache::new(16)),
            resolver,
            listeners: Arc::new(ChangeListeners::new()),
            idle_wait: Duration::from_millis(10),
        })
    }

    async fn drain_once(shared: &Arc<EnrichShared>) {
        let done = Arc::new(AtomicBool::new(false));
        let mut events = shared.listeners.subscribe();
        let worker = tokio::spawn(run_worker(Arc::clone(shared), Arc::clone(&done)));

        // The coalesced notification marks the end of the drain cycle
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("worker never flushed")
            .expect("listener channel closed");

        done.store(true, Ordering::SeqCst);
        shared.queue.wake();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_requests_resolve_once() {
        let resolver = Arc::new(FakeDirectory::with_entry("5551234567", "Ada"));
        let shared = make_shared(Arc::clone(&resolver));

        shared.queue.push(EnrichmentRequest::new("5551234567", 0, true));
        shared.queue.push(EnrichmentRequest::new("5551234567", 3, false));

        drain_once(&shared).await;

        assert_eq!(resolver.number_lookups.load(Ordering::SeqCst), 1);
        let info = shared.cache.get("5551234567").unwrap();
        assert_eq!(info.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_no_match_caches_empty_sentinel() {
        let resolver = Arc::new(FakeDirectory::default());
        let shared = make_shared(Arc::clone(&resolver));

        shared.queue.push(EnrichmentRequest::new("5550000000", 0, true));
        drain_once(&shared).await;

        // "looked up, no match" is distinct from "not yet looked up"
        let info = shared.cache.get_possibly_expired("5550000000").unwrap();
        assert!(info.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_error_is_swallowed_and_cached_as_miss() {
        let resolver = Arc::new(FakeDirectory::with_entry("5551234567", "Ada"));
        resolver.fail.store(true, Ordering::SeqCst);
        let shared = make_shared(Arc::clone(&resolver));

        shared.queue.push(EnrichmentRequest::new("5551234567", 0, true));
        drain_once(&shared).await;

        let info = shared.cache.get_possibly_expired("5551234567").unwrap();
        assert!(info.is_empty());

        // The worker survived; a later request resolves normally
        resolver.fail.store(false, Ordering::SeqCst);
        shared.queue.push(EnrichmentRequest::new("5551234567", 0, true));
        drain_once(&shared).await;
        let info = shared.cache.get("5551234567").unwrap();
        assert_eq!(info.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_uri_addresses_use_the_uri_channel() {
        let resolver = Arc::new(FakeDirectory::with_entry("alice@example.com", "Alice"));
        let shared = make_shared(Arc::clone(&resolver));

        shared.queue.push(EnrichmentRequest::new("alice@example.com", 0, true));
        drain_once(&shared).await;

        assert_eq!(resolver.uri_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.number_lookups.load(Ordering::SeqCst), 0);
        let info = shared.cache.get("alice@example.com").unwrap();
        assert_eq!(info.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_the_lookup() {
        let resolver = Arc::new(FakeDirectory::with_entry("5551234567", "Ada"));
        let shared = make_shared(Arc::clone(&resolver));
        shared.cache.put(
            "5551234567".to_string(),
            ContactInfo {
                contact_id: 9,
                name: Some("Cached Ada".to_string()),
                ..ContactInfo::EMPTY
            },
        );

        shared.queue.push(EnrichmentRequest::new("5551234567", 0, true));

        // No cache change happens, so no flush either; run the worker
        // briefly and check the lookup counter directly.
        let done = Arc::new(AtomicBool::new(false));
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), Arc::clone(&done)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        done.store(true, Ordering::SeqCst);
        shared.queue.wake();
        worker.await.unwrap();

        assert_eq!(resolver.number_lookups.load(Ordering::SeqCst), 0);
        let info = shared.cache.get("5551234567").unwrap();
        assert_eq!(info.name.as_deref(), Some("Cached Ada"));
    }

    #[tokio::test]
    async fn test_one_notification_per_drain_cycle() {
        let resolver = Arc::new(FakeDirectory::with_entry("5551230001", "Ada"));
        resolver.entries.lock().insert(
            "5551230002".to_string(),
            ContactInfo {
                contact_id: 2,
                name: Some("Grace".to_string()),
                ..ContactInfo::EMPTY
            },
        );
        let shared = make_shared(Arc::clone(&resolver));
        let mut events = shared.listeners.subscribe();

        shared.queue.push(EnrichmentRequest::new("5551230001", 0, true));
        shared.queue.push(EnrichmentRequest::new("5551230002", 1, false));

        let done = Arc::new(AtomicBool::new(false));
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), Arc::clone(&done)));

        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("worker never flushed")
            .unwrap();

        // Give the idle worker a chance to (incorrectly) emit again
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(events.try_recv().is_err(), "expected a single coalesced notification");

        done.store(true, Ordering::SeqCst);
        shared.queue.wake();
        worker.await.unwrap();
    }
}
