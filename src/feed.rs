//! Consumer-facing call feed.
//!
//! Ties the pieces together for the rendering layer: the two-part
//! cancellable fetch against the call-record store, the merged and grouped
//! row snapshot, per-row display assembly with cache-driven enrichment
//! requests, worker lifecycle around foreground/background transitions,
//! and the coalesced change-notification stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::cache::ExpiringCache;
use crate::config::FeedConfig;
use crate::enrich::{EnrichShared, RequestCoordinator, RequestQueue};
use crate::events::{ChangeListeners, FeedEvent};
use crate::group::CallSequence;
use crate::merge::merge_call_sections;
use crate::number;
use crate::store::{CallRecordStore, IdentityResolver, NumberFormatter};
use crate::types::{CallDetails, CallRecord, ContactInfo, EnrichmentRequest, Group, RowView, Section};

/// In-flight fetch bookkeeping. The generation counter guards against a
/// cancelled fetch racing its replacement and applying stale rows.
struct FetchState {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct FeedInner {
    config: FeedConfig,
    cache: Arc<ExpiringCache<String, ContactInfo>>,
    coordinator: Arc<RequestCoordinator>,
    store: Arc<dyn CallRecordStore>,
    formatter: Arc<dyn NumberFormatter>,
    listeners: Arc<ChangeListeners>,
    sequence: RwLock<Arc<CallSequence>>,
    fetch: Mutex<FetchState>,
    loading: AtomicBool,
}

/// The call history feed.
///
/// A cheap cloneable handle; clones share one feed. All read paths are
/// non-blocking; the only suspending work happens on background tasks
/// owned by the feed. When the last handle drops, the worker stops and
/// any in-flight fetch is cancelled.
#[derive(Clone)]
pub struct CallFeed {
    inner: Arc<FeedInner>,
}

impl CallFeed {
    pub fn new(
        config: FeedConfig,
        store: Arc<dyn CallRecordStore>,
        resolver: Arc<dyn IdentityResolver>,
        formatter: Arc<dyn NumberFormatter>,
    ) -> Self {
        let cache = Arc::new(ExpiringCache::new(config.cache_capacity));
        let listeners = Arc::new(ChangeListeners::new());
        let shared = Arc::new(EnrichShared {
            queue: RequestQueue::new(),
            cache: Arc::clone(&cache),
            resolver,
            listeners: Arc::clone(&listeners),
            idle_wait: Duration::from_millis(config.idle_wait_ms),
        });
        let coordinator = Arc::new(RequestCoordinator::new(
            shared,
            Duration::from_millis(config.start_delay_ms),
        ));

        CallFeed {
            inner: Arc::new(FeedInner {
                config,
                cache,
                coordinator,
                store,
                formatter,
                listeners,
                sequence: RwLock::new(Arc::new(CallSequence::default())),
                fetch: Mutex::new(FetchState { generation: 0, handle: None }),
                loading: AtomicBool::new(true),
            }),
        }
    }

    /// Subscribe to the coalesced change-notification stream.
    pub fn subscribe(&self) -> UnboundedReceiver<FeedEvent> {
        self.inner.listeners.subscribe()
    }

    // -----------------------------------------------------------------------
    // Fetch
    // -----------------------------------------------------------------------

    /// Re-query the call-record store and replace the row snapshot.
    ///
    /// Any not-yet-completed prior fetch is cancelled first, so a stale
    /// result can never overwrite a newer one out of order.
    pub fn refresh(&self) {
        self.inner.loading.store(true, Ordering::SeqCst);

        let mut fetch = self.inner.fetch.lock();
        fetch.generation += 1;
        let generation = fetch.generation;
        if let Some(previous) = fetch.handle.take() {
            previous.abort();
        }

        let feed = self.clone();
        fetch.handle = Some(tokio::spawn(async move {
            let inner = &feed.inner;
            let (new_res, old_res) =
                tokio::join!(inner.store.fetch_new_calls(), inner.store.fetch_old_calls());

            match (new_res, old_res) {
                (Ok(mut new_calls), Ok(mut old_calls)) => {
                    new_calls.tag_section(Section::NewItem);
                    old_calls.tag_section(Section::OldItem);
                    let rows = merge_call_sections(new_calls, old_calls);
                    feed.apply_rows(generation, rows);
                }
                (new_res, old_res) => {
                    for err in [new_res.err(), old_res.err()].into_iter().flatten() {
                        log::warn!("call feed: fetch failed: {}", err);
                    }
                }
            }
        }));
    }

    fn apply_rows(&self, generation: u64, rows: Vec<CallRecord>) {
        let inner = &self.inner;
        {
            let fetch = inner.fetch.lock();
            if fetch.generation != generation {
                log::debug!("call feed: dropping superseded fetch result");
                return;
            }
        }

        let sequence = CallSequence::new(rows);
        log::debug!(
            "call feed: applied {} rows, {} groups",
            sequence.len(),
            sequence.groups().len()
        );
        *inner.sequence.write() = Arc::new(sequence);
        inner.loading.store(false, Ordering::SeqCst);

        Arc::clone(&inner.coordinator).schedule_deferred_start();
        inner.listeners.emit(FeedEvent::DataChanged);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Foreground-resume: previously known names show immediately while a
    /// background refresh is implicitly scheduled as rows render.
    pub fn on_resume(&self) {
        self.inner.cache.expire_all();
        self.inner.coordinator.arm_auto_start();
        self.refresh();

        let feed = self.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.inner.store.mark_missed_seen().await {
                log::warn!("call feed: failed to mark missed calls seen: {}", e);
            }
        });
    }

    /// Background transition: stop the worker, dropping pending requests.
    pub fn on_pause(&self) {
        self.inner.coordinator.stop_processing();
    }

    /// Whether the initial (or a replacement) fetch is still outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// Whether there is nothing to show. Suppressed while loading so the
    /// empty state never flashes before the first fetch lands.
    pub fn is_empty(&self) -> bool {
        !self.is_loading() && self.inner.sequence.read().is_empty()
    }

    // -----------------------------------------------------------------------
    // Rows and groups
    // -----------------------------------------------------------------------

    /// Snapshot of the current merged sequence and its groups.
    pub fn sequence(&self) -> Arc<CallSequence> {
        Arc::clone(&*self.inner.sequence.read())
    }

    /// The current multi-row groups.
    pub fn groups(&self) -> Vec<Group> {
        self.inner.sequence.read().groups().to_vec()
    }

    /// Assemble the display payload for one row.
    ///
    /// This is where enrichment is driven from: a row with no cached data
    /// at all caches a provisional miss and files an urgent request; a row
    /// with merely expired data un-expires it (so siblings sharing the
    /// number don't re-request) and files a deferred one.
    pub fn row_view(&self, position: usize) -> Option<RowView> {
        let inner = &self.inner;
        let sequence = self.sequence();
        let record = sequence.row(position)?;

        if record.section.is_header() {
            return Some(RowView::Header { new_section: record.section.is_new() });
        }

        let num = &record.number;
        let country_iso = record.country_iso.as_deref();

        let (info, formatted) = match inner.cache.get_cached_value(num.as_str()) {
            None => {
                inner.cache.put(num.clone(), ContactInfo::EMPTY);
                log::debug!("call feed: contact info missing for {}", num);
                inner
                    .coordinator
                    .enqueue(EnrichmentRequest::new(num, position, true));
                (ContactInfo::EMPTY, self.format_number(num, None, country_iso))
            }
            Some((info, expired)) if !info.is_empty() => {
                if expired {
                    // Put it back un-expired before requesting the refresh
                    inner.cache.put(num.clone(), info.clone());
                    log::debug!("call feed: contact info expired for {}", num);
                    inner
                        .coordinator
                        .enqueue(EnrichmentRequest::with_snapshot(num, position, &info, false));
                }

                let mut info = info;
                if info.formatted_number.is_none() {
                    let raw = info.number.clone().unwrap_or_else(|| num.clone());
                    let formatted =
                        self.format_number(&raw, info.normalized_number.as_deref(), country_iso);
                    info.formatted_number = Some(formatted);
                    // Copy-on-write fill of the lazily formatted number
                    inner.cache.put(num.clone(), info.clone());
                }
                let formatted = info.formatted_number.clone().unwrap_or_default();
                (info, formatted)
            }
            Some((info, _)) => {
                // Known miss: show the raw call-log number
                (info, self.format_number(num, None, country_iso))
            }
        };

        let count = sequence.group_size_at(position);
        Some(RowView::Call(Box::new(CallDetails {
            number: num.clone(),
            formatted_number: formatted,
            call_types: sequence.call_types_at(position, count),
            timestamp: record.timestamp,
            duration_secs: record.duration_secs,
            name: info.name.clone(),
            number_type: info.number_type,
            label: info.label.clone(),
            contact_id: info.contact_id,
            photo_id: info.photo_id,
            lookup_key: info.lookup_key,
            is_new: record.section.is_new(),
        })))
    }

    // -----------------------------------------------------------------------
    // Contact reads
    // -----------------------------------------------------------------------

    /// Possibly-expired contact read for a number.
    pub fn contact_info(&self, number: &str) -> Option<ContactInfo> {
        self.inner.cache.get_possibly_expired(number)
    }

    /// The best dialable form of a caller-id number.
    ///
    /// Caller-id numbers can arrive stripped or truncated while roaming;
    /// when the directory matched this number against a better-qualified
    /// one, prefer that. Cache-only: never blocks on a lookup.
    pub fn better_number(&self, number: &str) -> String {
        if number.starts_with('+') || number::is_unreachable(number) {
            return number.to_string();
        }
        let matched = self
            .inner
            .cache
            .get_possibly_expired(number)
            .filter(|info| !info.is_empty())
            .and_then(|info| info.number);
        number::better_number(number, matched.as_deref()).to_string()
    }

    /// Whether the number is the configured voicemail number.
    pub fn is_voicemail_number(&self, num: &str) -> bool {
        number::is_voicemail(num, self.inner.config.voicemail_number.as_deref())
    }

    /// Current enrichment queue depth (for diagnostics).
    pub fn pending_requests(&self) -> usize {
        self.inner.coordinator.pending_requests()
    }

    // -----------------------------------------------------------------------
    // Test hooks
    // -----------------------------------------------------------------------

    /// Suppress all enrichment processing.
    pub fn disable_request_processing_for_test(&self) {
        self.inner.coordinator.disable_processing_for_test();
    }

    /// Seed the cache directly.
    pub fn inject_contact_info_for_test(&self, number: &str, info: ContactInfo) {
        self.inner.cache.put(number.to_string(), info);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn format_number(&self, num: &str, normalized: Option<&str>, country_iso: Option<&str>) -> String {
        if num.is_empty() {
            return String::new();
        }
        // URI-style addresses get no telephony formatting at all
        if number::is_uri_address(num) {
            return num.to_string();
        }
        let country = country_iso
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.inner.config.country_iso);
        self.inner.formatter.format(num, normalized, country)
    }
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        self.coordinator.stop_processing();
        if let Some(handle) = self.fetch.lock().handle.take() {
            handle.abort();
        }
    }
}
