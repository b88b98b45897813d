//! Breakpoint markers and their reconciliation with the host.

use std::collections::HashSet;

use tracing::{debug, info};

use super::anchor::{AnchorId, AnchorProvider, Range};
use crate::model::Breakpoint;

/// Lifecycle of a persisted breakpoint marker.
///
/// A hover hint is not a marker; it lives outside the tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    /// Placed by the user, not yet confirmed by the host.
    Unverified,
    /// Laid out by an authoritative host push.
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMarker {
    pub anchor: AnchorId,
    /// Range last seen for this marker; compared against the live anchor.
    pub range: Range,
    pub enabled: bool,
    pub state: MarkerState,
}

#[derive(Debug, Default)]
pub struct BreakpointManager {
    markers: Vec<TrackedMarker>,
    hint: Option<AnchorId>,
    report_pending: bool,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[TrackedMarker] {
        &self.markers
    }

    /// Live line of the hover hint, if one is shown.
    pub fn hint_line(&self, anchors: &dyn AnchorProvider) -> Option<u32> {
        self.hint
            .and_then(|id| anchors.resolve(id))
            .map(|r| r.start_line)
    }

    /// Whether a toggle is waiting for the coalescing window to close.
    pub fn is_report_pending(&self) -> bool {
        self.report_pending
    }

    /// State of the marker currently sitting on `line`.
    pub fn state_at(&self, anchors: &dyn AnchorProvider, line: u32) -> Option<MarkerState> {
        self.index_at(anchors, line).map(|i| self.markers[i].state)
    }

    /// Mouse moved over the gutter at `line`, or left it (`None`).
    pub fn hover(&mut self, anchors: &mut dyn AnchorProvider, line: Option<u32>) {
        self.clear_hint(anchors);
        if let Some(line) = line {
            if self.index_at(anchors, line).is_none() {
                let id = anchors.create_anchor(Range::line(line));
                self.hint = Some(id);
            }
        }
    }

    /// Add or remove the marker on `line`. Returns true if one was added.
    ///
    /// The lookup uses each marker's live position, so a marker that has
    /// drifted onto `line` is the one removed.
    pub fn toggle(&mut self, anchors: &mut dyn AnchorProvider, line: u32) -> bool {
        self.clear_hint(anchors);
        let added = match self.index_at(anchors, line) {
            Some(index) => {
                let marker = self.markers.remove(index);
                anchors.remove(marker.anchor);
                false
            }
            None => {
                let range = Range::line(line);
                self.markers.push(TrackedMarker {
                    anchor: anchors.create_anchor(range),
                    range,
                    enabled: true,
                    state: MarkerState::Unverified,
                });
                true
            }
        };
        debug!(line, added, "breakpoint toggled");
        self.report_pending = true;
        added
    }

    /// Replace every marker with the host's authoritative list.
    ///
    /// Any pending local report is dropped: the host already holds this set.
    pub fn decorate(&mut self, anchors: &mut dyn AnchorProvider, breakpoints: &[Breakpoint]) {
        for marker in self.markers.drain(..) {
            anchors.remove(marker.anchor);
        }
        for bp in breakpoints {
            let range = Range::line(bp.line_number);
            self.markers.push(TrackedMarker {
                anchor: anchors.create_anchor(range),
                range,
                enabled: bp.enable,
                state: MarkerState::Verified,
            });
        }
        self.report_pending = false;
        info!(count = breakpoints.len(), "breakpoints decorated");
    }

    /// Compare verified markers with their live anchors after an edit.
    ///
    /// Markers whose anchor no longer resolves are dropped. If any verified
    /// marker moved, the cached ranges are refreshed and the full canonical
    /// set is returned for reporting.
    pub fn check_drift(&mut self, anchors: &dyn AnchorProvider) -> Option<Vec<Breakpoint>> {
        self.markers.retain(|m| {
            let live = anchors.resolve(m.anchor).is_some();
            if !live {
                debug!(anchor = ?m.anchor, "dropping breakpoint with unresolved anchor");
            }
            live
        });
        let drifted = self.markers.iter().any(|m| {
            m.state == MarkerState::Verified && anchors.resolve(m.anchor) != Some(m.range)
        });
        if !drifted {
            return None;
        }
        for marker in &mut self.markers {
            if let Some(range) = anchors.resolve(marker.anchor) {
                marker.range = range;
            }
        }
        self.report_pending = false;
        let report = self.canonical(anchors);
        info!(count = report.len(), "breakpoints drifted");
        Some(report)
    }

    /// Deduplicated breakpoints at their live lines, ascending.
    ///
    /// When markers share a line, the first one tracked decides `enable`.
    pub fn canonical(&self, anchors: &dyn AnchorProvider) -> Vec<Breakpoint> {
        let mut seen = HashSet::new();
        let mut list: Vec<Breakpoint> = self
            .markers
            .iter()
            .filter_map(|m| {
                let range = anchors.resolve(m.anchor)?;
                seen.insert(range.start_line)
                    .then(|| Breakpoint::new(range.start_line, m.enabled))
            })
            .collect();
        list.sort_by_key(|bp| bp.line_number);
        list
    }

    /// Close the coalescing window, returning the set to report if a toggle
    /// happened since the last report.
    pub fn flush_pending(&mut self, anchors: &dyn AnchorProvider) -> Option<Vec<Breakpoint>> {
        if !self.report_pending {
            return None;
        }
        self.report_pending = false;
        Some(self.canonical(anchors))
    }

    fn index_at(&self, anchors: &dyn AnchorProvider, line: u32) -> Option<usize> {
        self.markers.iter().position(|m| {
            anchors
                .resolve(m.anchor)
                .is_some_and(|r| r.start_line == line)
        })
    }

    fn clear_hint(&mut self, anchors: &mut dyn AnchorProvider) {
        if let Some(id) = self.hint.take() {
            anchors.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::LineAnchors;

    fn lines(list: &[Breakpoint]) -> Vec<u32> {
        list.iter().map(|b| b.line_number).collect()
    }

    // ── toggle ──

    #[test]
    fn toggle_on_then_off() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();

        assert!(bps.toggle(&mut anchors, 1));
        assert_eq!(bps.state_at(&anchors, 1), Some(MarkerState::Unverified));
        assert_eq!(
            bps.flush_pending(&anchors),
            Some(vec![Breakpoint::new(1, true)])
        );

        assert!(!bps.toggle(&mut anchors, 1));
        assert_eq!(bps.flush_pending(&anchors), Some(vec![]));
        assert!(anchors.is_empty());
    }

    #[test]
    fn rapid_toggles_coalesce_into_one_report() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.toggle(&mut anchors, 2);
        bps.toggle(&mut anchors, 4);
        bps.toggle(&mut anchors, 2);
        assert_eq!(lines(&bps.flush_pending(&anchors).unwrap()), vec![4]);
        assert_eq!(bps.flush_pending(&anchors), None);
    }

    #[test]
    fn toggle_finds_marker_by_live_line() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.toggle(&mut anchors, 3);
        anchors.insert_lines(1, 2);
        assert!(bps.state_at(&anchors, 3).is_none());
        assert!(!bps.toggle(&mut anchors, 5));
        assert!(bps.markers().is_empty());
    }

    // ── hint ──

    #[test]
    fn hover_shows_single_hint_on_free_lines() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.hover(&mut anchors, Some(4));
        bps.hover(&mut anchors, Some(6));
        assert_eq!(bps.hint_line(&anchors), Some(6));
        assert_eq!(anchors.len(), 1);

        bps.toggle(&mut anchors, 6);
        assert_eq!(bps.hint_line(&anchors), None);
        bps.hover(&mut anchors, Some(6));
        assert_eq!(bps.hint_line(&anchors), None);

        bps.hover(&mut anchors, None);
        assert_eq!(anchors.len(), 1);
    }

    #[test]
    fn hint_follows_edits() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.hover(&mut anchors, Some(4));
        anchors.insert_lines(2, 3);
        assert_eq!(bps.hint_line(&anchors), Some(7));
    }

    // ── host push ──

    #[test]
    fn decorate_replaces_and_verifies() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.toggle(&mut anchors, 9);
        bps.decorate(
            &mut anchors,
            &[Breakpoint::new(2, true), Breakpoint::new(3, false)],
        );
        assert!(!bps.is_report_pending());
        assert_eq!(bps.markers().len(), 2);
        assert!(bps.markers().iter().all(|m| m.state == MarkerState::Verified));
        assert_eq!(
            bps.canonical(&anchors),
            vec![Breakpoint::new(2, true), Breakpoint::new(3, false)]
        );
        assert_eq!(anchors.len(), 2);
    }

    // ── drift ──

    #[test]
    fn collapsed_markers_report_once_per_line() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.decorate(
            &mut anchors,
            &[
                Breakpoint::new(5, false),
                Breakpoint::new(6, true),
                Breakpoint::new(8, true),
            ],
        );
        // Deleting line 5 moves the marker from 6 onto 5; the insert below
        // brings the last one back to 8.
        anchors.delete_lines(5, 1);
        anchors.insert_lines(7, 1);
        let report = bps.check_drift(&anchors).unwrap();
        assert_eq!(
            report,
            vec![Breakpoint::new(5, false), Breakpoint::new(8, true)]
        );
    }

    #[test]
    fn drift_reports_exactly_once() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.decorate(&mut anchors, &[Breakpoint::new(4, true), Breakpoint::new(10, true)]);
        assert_eq!(bps.check_drift(&anchors), None);

        anchors.insert_lines(6, 3);
        let report = bps.check_drift(&anchors).unwrap();
        assert_eq!(lines(&report), vec![4, 13]);
        assert_eq!(bps.check_drift(&anchors), None);
    }

    #[test]
    fn unverified_markers_do_not_trigger_drift() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.toggle(&mut anchors, 3);
        bps.flush_pending(&anchors);
        anchors.insert_lines(1, 1);
        assert_eq!(bps.check_drift(&anchors), None);
        assert_eq!(lines(&bps.canonical(&anchors)), vec![4]);
    }

    #[test]
    fn unresolved_anchor_dropped_silently() {
        let mut anchors = LineAnchors::new();
        let mut bps = BreakpointManager::new();
        bps.decorate(&mut anchors, &[Breakpoint::new(1, true), Breakpoint::new(2, true)]);
        let gone = bps.markers()[0].anchor;
        anchors.discard(gone);
        assert_eq!(bps.check_drift(&anchors), None);
        assert_eq!(bps.markers().len(), 1);
        assert_eq!(lines(&bps.canonical(&anchors)), vec![2]);
    }
}
