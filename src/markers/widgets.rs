//! Inline error and code panels shown after a line.

use super::anchor::{AnchorId, AnchorProvider, Range};
use crate::grammar::{Grammar, LineTokens};
use crate::model::ErrorLink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetKind {
    /// An error message with the host's action links.
    Error { links: Vec<ErrorLink> },
    /// A code excerpt, tokenized, with the executing line marked.
    Code {
        tokens: Vec<LineTokens>,
        current: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    anchor: AnchorId,
    pub data: String,
    pub text: String,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, WidgetKind::Error { .. })
    }
}

/// Append-only list of inline panels, cleared in bulk.
#[derive(Debug, Default)]
pub struct InlineWidgets {
    widgets: Vec<Widget>,
    error_links: Vec<ErrorLink>,
}

impl InlineWidgets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Line the widget is currently shown after.
    pub fn after_line(&self, anchors: &dyn AnchorProvider, widget: &Widget) -> Option<u32> {
        anchors.resolve(widget.anchor).map(|r| r.start_line)
    }

    /// Links attached to error panels created from now on.
    pub fn set_error_links(&mut self, links: Vec<ErrorLink>) {
        self.error_links = links;
    }

    pub fn show_error(&mut self, anchors: &mut dyn AnchorProvider, line: u32, data: &str, text: &str) {
        self.widgets.push(Widget {
            anchor: anchors.create_anchor(Range::line(line)),
            data: data.to_string(),
            text: text.to_string(),
            kind: WidgetKind::Error {
                links: self.error_links.clone(),
            },
        });
    }

    /// Show `text` highlighted with `grammar`; its second line is the
    /// executing step.
    pub fn show_code(
        &mut self,
        anchors: &mut dyn AnchorProvider,
        grammar: &Grammar,
        line: u32,
        data: &str,
        text: &str,
    ) {
        let tokens = grammar.tokenize(text);
        let current = (tokens.len() > 1).then_some(1);
        self.widgets.push(Widget {
            anchor: anchors.create_anchor(Range::line(line)),
            data: data.to_string(),
            text: text.to_string(),
            kind: WidgetKind::Code { tokens, current },
        });
    }

    pub fn clear_errors(&mut self, anchors: &mut dyn AnchorProvider) {
        self.widgets.retain(|w| {
            if w.is_error() {
                anchors.remove(w.anchor);
            }
            !w.is_error()
        });
    }

    pub fn clear(&mut self, anchors: &mut dyn AnchorProvider) {
        for widget in self.widgets.drain(..) {
            anchors.remove(widget.anchor);
        }
    }
}
