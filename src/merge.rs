//! Section merge for the call list.
//!
//! Combines the independently fetched "new" and "old" result sets into the
//! single display sequence `[new-header, new-item...] + [old-header,
//! old-item...]`, omitting any section with no rows. Header rows are
//! synthetic and exist only to mark section boundaries for rendering and
//! grouping.

use crate::store::RecordBatch;
use crate::types::{CallRecord, Section};

/// Merge the two fetched sections into one display sequence.
///
/// Ownership of both batches transfers here: rows of a non-empty section
/// are forwarded into the result, and an unused (empty) section's source
/// is closed immediately instead of lingering open.
pub fn merge_call_sections(new_calls: RecordBatch, old_calls: RecordBatch) -> Vec<CallRecord> {
    let no_new = new_calls.is_empty();
    let no_old = old_calls.is_empty();

    if no_new && no_old {
        new_calls.close();
        old_calls.close();
        return Vec::new();
    }

    if no_new {
        new_calls.close();
        let old_rows = old_calls.into_rows();
        let mut merged = Vec::with_capacity(old_rows.len() + 1);
        merged.push(CallRecord::section_header(Section::OldHeader));
        merged.extend(old_rows);
        return merged;
    }

    if no_old {
        old_calls.close();
        let new_rows = new_calls.into_rows();
        let mut merged = Vec::with_capacity(new_rows.len() + 1);
        merged.push(CallRecord::section_header(Section::NewHeader));
        merged.extend(new_rows);
        return merged;
    }

    let new_rows = new_calls.into_rows();
    let old_rows = old_calls.into_rows();
    let mut merged = Vec::with_capacity(new_rows.len() + old_rows.len() + 2);
    merged.push(CallRecord::section_header(Section::NewHeader));
    merged.extend(new_rows);
    merged.push(CallRecord::section_header(Section::OldHeader));
    merged.extend(old_rows);
    merged
}
