//! Adjacent-call grouping.
//!
//! A single left-to-right scan over the merged sequence coalesces adjacent
//! rows sharing one number into display groups. Missed calls must stay
//! visible: a missed row never extends the run before it and is never
//! absorbed into one, but the block immediately after a missed call to the
//! same number may still group together.

use crate::number::numbers_equal;
use crate::types::{CallRecord, CallType, Group};

/// Compute the multi-row groups of the merged sequence.
///
/// The scan keeps a (number, call-type) accumulator seeded from row 0. A
/// row extends the current run only when its number matches the
/// accumulator's, it is not a missed call, it is not a section header, and
/// the accumulator itself is not classified missed. Anything else closes
/// the run; runs spanning more than one row are recorded.
pub fn compute_groups(rows: &[CallRecord]) -> Vec<Group> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut groups = Vec::new();
    let mut run_len: usize = 1;
    let mut acc_number: &str = &rows[0].number;
    let mut acc_missed = rows[0].call_type == CallType::Missed;

    for (i, row) in rows.iter().enumerate().skip(1) {
        let same_number = numbers_equal(&row.number, acc_number);
        let extends = same_number
            && row.call_type != CallType::Missed
            && !row.section.is_header()
            && !acc_missed;

        if extends {
            run_len += 1;
            continue;
        }

        if run_len > 1 {
            groups.push(Group { start: i - run_len, count: run_len });
        }
        run_len = 1;

        // If the run we just closed was missed and this row carries the
        // same number, reclassify the new run as "not missed" so calls
        // after the missed one can still group together.
        acc_missed = if same_number && acc_missed && !row.section.is_header() {
            false
        } else {
            row.call_type == CallType::Missed
        };
        acc_number = &row.number;
    }

    if run_len > 1 {
        groups.push(Group { start: rows.len() - run_len, count: run_len });
    }

    groups
}

/// The merged row sequence and its computed groups.
///
/// Replaced wholesale on every refresh; readers hold an `Arc` snapshot so
/// a concurrent refresh never mutates rows under them.
#[derive(Debug, Default)]
pub struct CallSequence {
    rows: Vec<CallRecord>,
    groups: Vec<Group>,
}

impl CallSequence {
    pub fn new(rows: Vec<CallRecord>) -> Self {
        let groups = compute_groups(&rows);
        CallSequence { rows, groups }
    }

    pub fn rows(&self) -> &[CallRecord] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&CallRecord> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The group containing `position`, if it belongs to one.
    pub fn group_covering(&self, position: usize) -> Option<Group> {
        self.groups
            .iter()
            .copied()
            .find(|g| g.start <= position && position < g.start + g.count)
    }

    /// Whether `position` is the lead row of a multi-row group.
    pub fn is_group_start(&self, position: usize) -> bool {
        self.groups.iter().any(|g| g.start == position)
    }

    /// Number of rows represented by the row at `position`: the group size
    /// for a group lead, 1 for everything else.
    pub fn group_size_at(&self, position: usize) -> usize {
        self.groups
            .iter()
            .find(|g| g.start == position)
            .map(|g| g.count)
            .unwrap_or(1)
    }

    /// Call types of the `count` rows starting at `position`, for the
    /// grouped-row display.
    pub fn call_types_at(&self, position: usize, count: usize) -> Vec<CallType> {
        self.rows
            .iter()
            .skip(position)
            .take(count)
            .map(|r| r.call_type)
            .collect()
    }

    /// Record ids covered by a group, for detail navigation.
    pub fn record_ids(&self, group: Group) -> Vec<i64> {
        self.rows
            .iter()
            .skip(group.start)
            .take(group.count)
            .map(|r| r.id)
            .collect()
    }
}
