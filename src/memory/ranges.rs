//! Tracking of the byte ranges a file has been written to.

use crate::store::ByteRange;

/// Sorted, disjoint set of inclusive byte ranges.
///
/// Inserting a range that touches or overlaps existing ones coalesces them,
/// so the set always reports the minimal list of written spans.
#[derive(Clone, Debug, Default)]
pub(super) struct RangeSet {
    spans: Vec<ByteRange>,
}

impl RangeSet {
    /// Marks `start..=end` as written, merging with touching spans.
    pub(super) fn insert(&mut self, start: u64, end: u64) {
        if end < start {
            return;
        }
        let mut merged = ByteRange::new(start, end);
        let mut result = Vec::with_capacity(self.spans.len() + 1);
        let mut placed = false;
        for span in self.spans.drain(..) {
            if span.end.saturating_add(1) < merged.start {
                result.push(span);
            } else if merged.end.saturating_add(1) < span.start {
                if !placed {
                    result.push(merged);
                    placed = true;
                }
                result.push(span);
            } else {
                merged = ByteRange::new(merged.start.min(span.start), merged.end.max(span.end));
            }
        }
        if !placed {
            result.push(merged);
        }
        self.spans = result;
    }

    /// Snapshot of the written spans in ascending order.
    pub(super) fn as_ranges(&self) -> Vec<ByteRange> {
        self.spans.clone()
    }
}
