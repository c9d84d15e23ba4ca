//! Domain types for the call history feed.
//!
//! Rows come out of the call-record store already sorted newest-first and
//! split into two sets: "new" (unseen missed/voicemail calls) and "old"
//! (everything else). The merge pass stitches them into one sequence with
//! synthetic section headers; the grouping pass runs over that sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row id used for synthetic section-header rows, which have no backing
/// record in the call-record store.
pub const HEADER_ROW_ID: i64 = -1;

/// Kind of a call log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
    Voicemail,
}

/// Section tag carried by every row of the merged sequence.
///
/// Headers are synthetic non-data rows marking the start of a section;
/// items are real call records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    NewHeader,
    NewItem,
    OldHeader,
    OldItem,
}

impl Section {
    /// Whether this row is a synthetic section header.
    pub fn is_header(self) -> bool {
        matches!(self, Section::NewHeader | Section::OldHeader)
    }

    /// Whether this row belongs to the new-calls section.
    pub fn is_new(self) -> bool {
        matches!(self, Section::NewHeader | Section::NewItem)
    }
}

/// One immutable row of the merged call sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: i64,
    pub number: String,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: i64,
    pub call_type: CallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_iso: Option<String>,
    pub section: Section,
}

impl CallRecord {
    /// Build a synthetic header row for the given section.
    ///
    /// Header rows carry no real record id and an empty number, so they can
    /// never compare equal to an adjacent item during grouping.
    pub fn section_header(section: Section) -> Self {
        debug_assert!(section.is_header());
        CallRecord {
            id: HEADER_ROW_ID,
            number: String::new(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            duration_secs: 0,
            call_type: CallType::Incoming,
            country_iso: None,
            section,
        }
    }
}

/// Contact details resolved for a phone number.
///
/// Cached values are copy-on-write: a filled-in `formatted_number` is
/// written back as a fresh `put`, never mutated in place under readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub contact_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub number_type: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The number as matched by the directory, which may be better
    /// qualified than the caller-id number (see `number::better_number`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_number: Option<String>,
    pub photo_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,
    /// Computed lazily on first display; unset when the value enters the
    /// cache from a lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_number: Option<String>,
}

impl ContactInfo {
    /// Sentinel for "looked up, no match". Cached so the render path does
    /// not re-request a number the directory already failed to resolve.
    pub const EMPTY: ContactInfo = ContactInfo {
        contact_id: 0,
        name: None,
        number_type: 0,
        label: None,
        number: None,
        normalized_number: None,
        photo_id: 0,
        lookup_key: None,
        formatted_number: None,
    };

    /// Whether this value is the "no match" sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// A request for the background worker to resolve one number.
///
/// Carries a stale snapshot of the previously known contact fields so the
/// worker could detect changes without re-reading the cache; consumed
/// exactly once, then discarded.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    pub number: String,
    /// Row position the request was issued for, for diagnostics.
    pub position: usize,
    pub name: Option<String>,
    pub number_type: i32,
    pub label: Option<String>,
    pub photo_id: i64,
    pub lookup_key: Option<String>,
    /// Urgent requests may start the worker immediately, bypassing the
    /// settle delay; deferred ones wait for the normal start.
    pub immediate: bool,
}

impl EnrichmentRequest {
    /// Request for a number with no cached data at all.
    pub fn new(number: &str, position: usize, immediate: bool) -> Self {
        EnrichmentRequest {
            number: number.to_string(),
            position,
            name: None,
            number_type: 0,
            label: None,
            photo_id: 0,
            lookup_key: None,
            immediate,
        }
    }

    /// Request carrying the stale snapshot of an expired cache entry.
    pub fn with_snapshot(number: &str, position: usize, info: &ContactInfo, immediate: bool) -> Self {
        EnrichmentRequest {
            number: number.to_string(),
            position,
            name: info.name.clone(),
            number_type: info.number_type,
            label: info.label.clone(),
            photo_id: info.photo_id,
            lookup_key: info.lookup_key.clone(),
            immediate,
        }
    }
}

/// A contiguous run of adjacent rows sharing one number.
///
/// Only multi-row runs are recorded; every other row is an implicit
/// singleton. Groups are recomputed from scratch on every refresh and have
/// no identity beyond the sequence they were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    /// Index of the first row of the run in the merged sequence.
    pub start: usize,
    /// Number of rows in the run, always >= 2.
    pub count: usize,
}

/// Display payload assembled for one call row (or group lead row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDetails {
    pub number: String,
    pub formatted_number: String,
    /// Call types of this row and, for a group lead, the rows it covers.
    pub call_types: Vec<CallType>,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub number_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub contact_id: i64,
    pub photo_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,
    /// New-section rows render highlighted; old ones with icons.
    pub is_new: bool,
}

/// What the rendering layer gets for a display position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowView {
    /// Synthetic section header; `new_section` picks the header text.
    #[serde(rename_all = "camelCase")]
    Header { new_section: bool },
    Call(Box<CallDetails>),
}
