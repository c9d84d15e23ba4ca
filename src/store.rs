//! External collaborator seams.
//!
//! The feed owns none of its data sources. Call records live in an
//! external store, caller identities in a directory, and number formatting
//! rules in the telephony layer; all three are consumed through the traits
//! here so the core stays testable with in-memory fakes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{CallRecord, ContactInfo, Section};

/// One fetched, time-ordered set of call records.
///
/// Models the store cursor it was read from: whoever ends up owning the
/// batch is responsible for closing it, and dropping it unconsumed closes
/// it too. [`RecordBatch::close_handle`] gives tests an observable hook on
/// that contract.
#[derive(Debug)]
pub struct RecordBatch {
    rows: Vec<CallRecord>,
    closed: Arc<AtomicBool>,
}

/// Observer for a batch's closed state, held by tests.
#[derive(Debug, Clone)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl RecordBatch {
    pub fn new(rows: Vec<CallRecord>) -> Self {
        RecordBatch {
            rows,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle(Arc::clone(&self.closed))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stamp every row with the given item section. Fetched rows carry no
    /// section of their own; the fetch path tags them new or old before
    /// merging.
    pub fn tag_section(&mut self, section: Section) {
        debug_assert!(!section.is_header());
        for row in &mut self.rows {
            row.section = section;
        }
    }

    /// Close the batch without forwarding its rows.
    pub fn close(self) {
        // Drop marks the handle closed.
    }

    /// Take ownership of the rows, closing the batch.
    pub fn into_rows(mut self) -> Vec<CallRecord> {
        std::mem::take(&mut self.rows)
    }
}

impl Drop for RecordBatch {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Read/update access to the external call-record store.
///
/// Both fetches return rows sorted newest-first. "New" calls are the
/// unseen missed and voicemail entries; "old" calls are everything else.
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    async fn fetch_new_calls(&self) -> Result<RecordBatch, StoreError>;
    async fn fetch_old_calls(&self) -> Result<RecordBatch, StoreError>;

    /// Mark all new missed calls as seen. Fire-and-forget from the feed's
    /// point of view.
    async fn mark_missed_seen(&self) -> Result<(), StoreError>;
}

/// Directory lookup resolving a number to a contact identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve an ordinary dialable phone number.
    async fn lookup_number(&self, number: &str) -> Result<Option<ContactInfo>, StoreError>;

    /// Resolve a URI-style address (e.g. a SIP address).
    async fn lookup_uri_address(&self, address: &str) -> Result<Option<ContactInfo>, StoreError>;
}

/// Telephony-layer number formatting.
pub trait NumberFormatter: Send + Sync {
    /// Format `number` for display using the country's conventions,
    /// preferring `normalized_number` when present.
    fn format(&self, number: &str, normalized_number: Option<&str>, country_iso: &str) -> String;
}

/// Identity formatter: displays numbers exactly as stored.
pub struct PlainFormatter;

impl NumberFormatter for PlainFormatter {
    fn format(&self, number: &str, normalized_number: Option<&str>, _country_iso: &str) -> String {
        normalized_number.unwrap_or(number).to_string()
    }
}
