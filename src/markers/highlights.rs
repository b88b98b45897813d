//! Runtime step highlights pushed by the debugger.

use tracing::debug;

use super::anchor::{AnchorId, AnchorProvider, Range};

/// Class of the step being executed; at most one line set carries it.
pub const CURRENT: &str = "current";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Highlight {
    anchor: AnchorId,
    class: String,
}

/// Whole-line highlight classes (`current`, `complete`, `error`, ...).
///
/// A line carries at most one class: setting a class on a line removes
/// whatever was there before.
#[derive(Debug, Default)]
pub struct RuntimeHighlights {
    entries: Vec<Highlight>,
}

impl RuntimeHighlights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `class` to `lines`.
    ///
    /// For [`CURRENT`], every previous current line is released first. An
    /// empty class only clears the given lines.
    pub fn set(&mut self, anchors: &mut dyn AnchorProvider, class: &str, lines: &[u32]) {
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            let line = anchors.resolve(entry.anchor).map(|r| r.start_line);
            let superseded = class == CURRENT && entry.class == CURRENT;
            let touched = line.is_some_and(|l| lines.contains(&l));
            if line.is_none() || superseded || touched {
                anchors.remove(entry.anchor);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;

        if class.is_empty() {
            return;
        }
        let mut added: Vec<u32> = Vec::new();
        for &line in lines {
            if added.contains(&line) {
                continue;
            }
            added.push(line);
            self.entries.push(Highlight {
                anchor: anchors.create_anchor(Range::line(line)),
                class: class.to_string(),
            });
        }
        debug!(class, lines = ?added, "highlight set");
    }

    /// Live lines carrying `class`, ascending.
    pub fn get(&self, anchors: &dyn AnchorProvider, class: &str) -> Vec<u32> {
        let mut lines: Vec<u32> = self
            .entries
            .iter()
            .filter(|e| e.class == class)
            .filter_map(|e| anchors.resolve(e.anchor).map(|r| r.start_line))
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Class shown on `line`, if any.
    pub fn class_at(&self, anchors: &dyn AnchorProvider, line: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| anchors.resolve(e.anchor).is_some_and(|r| r.start_line == line))
            .map(|e| e.class.as_str())
    }

    pub fn clear(&mut self, anchors: &mut dyn AnchorProvider) {
        for entry in self.entries.drain(..) {
            anchors.remove(entry.anchor);
        }
    }
}
