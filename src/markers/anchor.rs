//! Stable positions supplied by the text host.

use std::collections::BTreeMap;

/// Opaque handle to a range the host keeps in place across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(u64);

/// A 1-based line/column range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    /// The empty range at the start of `line`.
    pub fn line(line: u32) -> Self {
        Self {
            start_line: line,
            start_column: 1,
            end_line: line,
            end_column: 1,
        }
    }
}

/// Position tracking offered by the host.
///
/// `resolve` returns `None` once the host has discarded an anchor; callers
/// treat that as the marker being gone.
pub trait AnchorProvider {
    fn create_anchor(&mut self, range: Range) -> AnchorId;
    fn resolve(&self, id: AnchorId) -> Option<Range>;
    fn remove(&mut self, id: AnchorId);
}

/// In-memory anchors that follow whole-line inserts and deletes.
///
/// Used by the CLI host bridge and by tests to replay edits
/// deterministically.
#[derive(Debug, Default)]
pub struct LineAnchors {
    next_id: u64,
    ranges: BTreeMap<AnchorId, Range>,
}

impl LineAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// `count` new lines were inserted before line `at`.
    pub fn insert_lines(&mut self, at: u32, count: u32) {
        for range in self.ranges.values_mut() {
            if range.start_line >= at {
                range.start_line += count;
                range.end_line += count;
            } else if range.end_line >= at {
                range.end_line += count;
            }
        }
    }

    /// Lines `start..start + count` were deleted.
    ///
    /// Anchors inside the deleted block collapse onto `start`.
    pub fn delete_lines(&mut self, start: u32, count: u32) {
        if count == 0 {
            return;
        }
        let end = start + count;
        let shift = |line: u32| {
            if line >= end {
                line - count
            } else if line >= start {
                start
            } else {
                line
            }
        };
        for range in self.ranges.values_mut() {
            let start_moved = range.start_line >= start;
            range.start_line = shift(range.start_line);
            range.end_line = shift(range.end_line);
            if start_moved && range.start_line == start && range.end_line == start {
                range.start_column = 1;
                range.end_column = 1;
            }
        }
    }

    /// Drop an anchor without its owner knowing, as a host may do.
    pub fn discard(&mut self, id: AnchorId) {
        self.ranges.remove(&id);
    }
}

impl AnchorProvider for LineAnchors {
    fn create_anchor(&mut self, range: Range) -> AnchorId {
        self.next_id += 1;
        let id = AnchorId(self.next_id);
        self.ranges.insert(id, range);
        id
    }

    fn resolve(&self, id: AnchorId) -> Option<Range> {
        self.ranges.get(&id).copied()
    }

    fn remove(&mut self, id: AnchorId) {
        self.ranges.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_following_anchors() {
        let mut anchors = LineAnchors::new();
        let a = anchors.create_anchor(Range::line(2));
        let b = anchors.create_anchor(Range::line(5));
        anchors.insert_lines(3, 2);
        assert_eq!(anchors.resolve(a), Some(Range::line(2)));
        assert_eq!(anchors.resolve(b), Some(Range::line(7)));
    }

    #[test]
    fn insert_at_anchor_line_pushes_it_down() {
        let mut anchors = LineAnchors::new();
        let a = anchors.create_anchor(Range::line(1));
        anchors.insert_lines(1, 1);
        assert_eq!(anchors.resolve(a).map(|r| r.start_line), Some(2));
    }

    #[test]
    fn delete_collapses_and_shifts() {
        let mut anchors = LineAnchors::new();
        let a = anchors.create_anchor(Range::line(5));
        let b = anchors.create_anchor(Range::line(6));
        let c = anchors.create_anchor(Range::line(9));
        anchors.delete_lines(5, 1);
        assert_eq!(anchors.resolve(a).map(|r| r.start_line), Some(5));
        assert_eq!(anchors.resolve(b).map(|r| r.start_line), Some(5));
        assert_eq!(anchors.resolve(c).map(|r| r.start_line), Some(8));
    }

    #[test]
    fn removed_and_discarded_do_not_resolve() {
        let mut anchors = LineAnchors::new();
        let a = anchors.create_anchor(Range::line(1));
        let b = anchors.create_anchor(Range::line(2));
        anchors.remove(a);
        anchors.discard(b);
        assert!(anchors.resolve(a).is_none());
        assert!(anchors.resolve(b).is_none());
        assert!(anchors.is_empty());
    }
}
