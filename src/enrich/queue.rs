//! Pending enrichment request queue.
//!
//! Single producer side (the render path), single consumer (the worker).
//! Appends are non-blocking and wake the worker; the worker's idle wait
//! always carries a timeout so a shutdown flag is noticed even when no
//! work arrives. Duplicate numbers are allowed; resolving the first
//! request satisfies the cache for the rest, so the worker's own cache
//! check turns the duplicates into no-ops.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::EnrichmentRequest;

/// Thread-safe FIFO of pending enrichment requests with wake-on-append.
#[derive(Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<EnrichmentRequest>>,
    wake: Notify,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and wake the worker if it is idle.
    pub fn push(&self, request: EnrichmentRequest) {
        self.pending.lock().push_back(request);
        self.wake.notify_one();
    }

    /// Take the oldest pending request, if any. Never blocks.
    pub fn pop(&self) -> Option<EnrichmentRequest> {
        self.pending.lock().pop_front()
    }

    /// Drop every pending request.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Wake the worker without enqueueing, e.g. so it notices shutdown.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Current queue depth (for diagnostics).
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until woken or until `timeout` elapses, whichever is first.
    ///
    /// A wake issued between the consumer's last `pop` and this call is
    /// not lost: `Notify` stores the permit and the wait returns at once.
    pub async fn idle_wait(&self, timeout: Duration) {
        tokio::select! {
            _ = self.wake.notified() => {}
            _ = tokio::time::sleep(timeout) => {}
        }
    }
}
