//! Worker lifecycle and request admission.
//!
//! The coordinator owns the single worker session: it starts one
//! immediately when an urgent request arrives before anything else has
//! started it, starts one after a settle delay once the first data load
//! lands, and stops it (dropping pending requests) when the feed goes to
//! the background. Restart spawns a fresh session against the same cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::types::EnrichmentRequest;

use super::worker::{run_worker, EnrichShared};

/// One spawned worker and its shutdown flag.
struct WorkerSession {
    done: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Decides when numbers get enriched and manages the worker lifecycle.
pub struct RequestCoordinator {
    shared: Arc<EnrichShared>,
    session: Mutex<Option<WorkerSession>>,
    deferred_start: Mutex<Option<JoinHandle<()>>>,
    /// Armed once per rendering session; stays set until a worker session
    /// actually starts, so an urgent request can still bypass a pending
    /// settle timer.
    auto_start_armed: AtomicBool,
    /// Test hook: suppresses all worker starts.
    processing_disabled: AtomicBool,
    start_delay: Duration,
}

impl RequestCoordinator {
    pub(crate) fn new(shared: Arc<EnrichShared>, start_delay: Duration) -> Self {
        RequestCoordinator {
            shared,
            session: Mutex::new(None),
            deferred_start: Mutex::new(None),
            auto_start_armed: AtomicBool::new(true),
            processing_disabled: AtomicBool::new(false),
            start_delay,
        }
    }

    /// Append a request. An urgent request starts the worker immediately
    /// if nothing has started it yet this session: rows on screen with no
    /// cached data at all should not wait out the settle delay. Deferred
    /// requests (merely expired data) never trigger a start by themselves.
    pub fn enqueue(&self, request: EnrichmentRequest) {
        let immediate = request.immediate;
        self.shared.queue.push(request);

        if immediate && self.auto_start_armed.load(Ordering::SeqCst) {
            self.start_processing();
        }
    }

    /// Spawn the worker session if none is running. Consumes the armed
    /// flag: once a session has started, nothing auto-starts another one
    /// until the next `arm_auto_start`.
    pub fn start_processing(&self) {
        if self.processing_disabled.load(Ordering::SeqCst) {
            return;
        }

        let mut session = self.session.lock();
        self.auto_start_armed.store(false, Ordering::SeqCst);
        if let Some(existing) = session.as_ref() {
            if !existing.done.load(Ordering::SeqCst) && !existing.handle.is_finished() {
                return;
            }
        }

        let done = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_worker(Arc::clone(&self.shared), Arc::clone(&done)));
        *session = Some(WorkerSession { done, handle });
        log::debug!("request coordinator: worker session started");
    }

    /// Start the worker after the settle delay, unless something starts it
    /// sooner.
    ///
    /// The generalization of the first-draw trigger: called after the
    /// first data load applies, so initial rendering settles before
    /// lookups begin. An urgent enqueue during the settle window still
    /// starts the worker immediately; the timer then finds a live session
    /// and does nothing.
    pub fn schedule_deferred_start(self: Arc<Self>) {
        if self.processing_disabled.load(Ordering::SeqCst) {
            return;
        }
        if !self.auto_start_armed.load(Ordering::SeqCst) {
            return;
        }

        let mut deferred = self.deferred_start.lock();
        if deferred.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let delay = self.start_delay;
        let coordinator = Arc::clone(&self);
        *deferred = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.start_processing();
        }));
    }

    /// Stop the current worker session and drop its pending requests.
    ///
    /// Idempotent and safe to call from anywhere, including concurrently
    /// with a dequeue in progress: the worker observes the done flag on
    /// its next loop turn, and an in-flight lookup is abandoned, not
    /// cancelled. Requests enqueued after this call survive for the next
    /// session.
    pub fn stop_processing(&self) {
        if let Some(timer) = self.deferred_start.lock().take() {
            timer.abort();
        }

        if let Some(session) = self.session.lock().take() {
            session.done.store(true, Ordering::SeqCst);
            self.shared.queue.clear();
            self.shared.queue.wake();
            log::debug!("request coordinator: worker session stopped");
        }
    }

    /// Re-arm the auto-start triggers for a new rendering session.
    pub fn arm_auto_start(&self) {
        self.auto_start_armed.store(true, Ordering::SeqCst);
    }

    /// Whether a worker session is currently live.
    pub fn is_processing(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.done.load(Ordering::SeqCst) && !s.handle.is_finished())
    }

    /// Current queue depth (for diagnostics).
    pub fn pending_requests(&self) -> usize {
        self.shared.queue.len()
    }

    /// Test hook: suppress worker starts entirely.
    pub fn disable_processing_for_test(&self) {
        self.processing_disabled.store(true, Ordering::SeqCst);
    }
}
