//! One editor instance: document, tables, markers and the outbound event
//! queue.
//!
//! The host drives an [`Editor`] with configuration payloads, debugger
//! state and user input; everything the editor has to tell the host is
//! queued as [`HostEvent`]s and collected with [`Editor::drain_events`].

use tracing::debug;

use crate::config::EditorConfig;
use crate::context::EditorContext;
use crate::error::ConfigError;
use crate::grammar::LineTokens;
use crate::markers::{
    BreakpointManager, InlineWidgets, LineAnchors, MarkerState, RuntimeHighlights, Widget,
};
use crate::model::{Breakpoint, EditorEvent, ErrorLink, HostEvent, LineList, Problem};

/// Keyboard commands bound by the editor (F5 and friends, F9, F11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartDebugging,
    StartDebuggingAtStep,
    StartDebuggingAtStepAndContinue,
    StartDebuggingAtEntry,
    StepOver,
    ToggleBreakpoint,
}

#[derive(Debug)]
pub struct Editor {
    context: EditorContext,
    lines: Vec<String>,
    /// Line terminator of the last full content, used when joining.
    eol: &'static str,
    final_newline: bool,
    tokens: Vec<LineTokens>,
    problems: Vec<Problem>,
    cursor_line: u32,
    anchors: LineAnchors,
    breakpoints: BreakpointManager,
    highlights: RuntimeHighlights,
    widgets: InlineWidgets,
    outbox: Vec<HostEvent>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorContext::default())
    }
}

impl Editor {
    pub fn new(context: EditorContext) -> Self {
        let mut editor = Self {
            context,
            lines: Vec::new(),
            eol: "\n",
            final_newline: false,
            tokens: Vec::new(),
            problems: Vec::new(),
            cursor_line: 1,
            anchors: LineAnchors::new(),
            breakpoints: BreakpointManager::new(),
            highlights: RuntimeHighlights::new(),
            widgets: InlineWidgets::new(),
            outbox: Vec::new(),
        };
        editor.refresh();
        editor
    }

    pub fn from_config(config: &EditorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(EditorContext::from_config(config)?))
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    // ── document ──

    /// The document text, with the line ending and final newline of the
    /// last [`Editor::set_content`]. Mixed endings come back uniform.
    pub fn content(&self) -> String {
        let mut text = self.lines.join(self.eol);
        if self.final_newline && !self.lines.is_empty() {
            text.push_str(self.eol);
        }
        text
    }

    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Token spans per line for the current document.
    pub fn tokens(&self) -> &[LineTokens] {
        &self.tokens
    }

    /// Result of the last syntax check.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Replace the whole document.
    pub fn set_content(&mut self, text: &str) {
        self.eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        self.final_newline = text.ends_with('\n');
        let lines = text.lines().map(str::to_string).collect();
        self.apply_edit(1, self.lines.len() as u32, lines);
    }

    /// Replace `delete` lines starting at 1-based `start` with `insert`.
    ///
    /// Lines replaced one-for-one keep their markers; the surplus is a pure
    /// insert or delete, which moves the markers below it.
    pub fn apply_edit(&mut self, start: u32, delete: u32, insert: Vec<String>) {
        let len = self.lines.len() as u32;
        let start = start.clamp(1, len + 1);
        let delete = delete.min(len + 1 - start);
        let inserted = insert.len() as u32;

        let from = (start - 1) as usize;
        self.lines.splice(from..from + delete as usize, insert);

        let common = delete.min(inserted);
        if delete > inserted {
            self.anchors.delete_lines(start + common, delete - inserted);
        } else if inserted > delete {
            self.anchors.insert_lines(start + common, inserted - delete);
        }
        self.cursor_line = self.cursor_line.clamp(1, self.line_count().max(1));
        debug!(start, delete, inserted, "document edited");

        self.refresh();
        self.fire(EditorEvent::ContentDidChange, None);
        if let Some(report) = self.breakpoints.check_drift(&self.anchors) {
            self.outbox.push(HostEvent::breakpoints(&report));
        }
    }

    // ── configuration ──

    pub fn set_keywords(&mut self, payload: &str) -> Result<(), ConfigError> {
        self.context.set_keywords(payload)?;
        self.refresh();
        Ok(())
    }

    pub fn set_elements(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        self.context.set_elements(payload, clear)?;
        self.refresh();
        Ok(())
    }

    pub fn set_variables(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        self.context.set_variables(payload, clear)?;
        self.refresh();
        Ok(())
    }

    /// Load steps, then re-tokenize and re-check the whole document.
    pub fn set_step_list(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        self.context.set_step_list(payload, clear)?;
        self.refresh();
        Ok(())
    }

    pub fn set_syntax_message(&mut self, message: &str) {
        self.context.set_syntax_message(message);
        self.refresh();
    }

    pub fn set_error_links(&mut self, payload: &str) -> Result<(), ConfigError> {
        let links: Vec<ErrorLink> =
            serde_json::from_str(payload).map_err(ConfigError::malformed("error links"))?;
        self.widgets.set_error_links(links);
        Ok(())
    }

    // ── breakpoints ──

    /// Authoritative breakpoint list from the host; cancels a pending report.
    pub fn decorate_breakpoints(&mut self, payload: &str) -> Result<(), ConfigError> {
        let list: Vec<Breakpoint> =
            serde_json::from_str(payload).map_err(ConfigError::malformed("breakpoints"))?;
        self.breakpoints.decorate(&mut self.anchors, &list);
        Ok(())
    }

    pub fn toggle_breakpoint(&mut self, line: u32) -> bool {
        self.breakpoints.toggle(&mut self.anchors, line)
    }

    pub fn hover_gutter(&mut self, line: Option<u32>) {
        self.breakpoints.hover(&mut self.anchors, line);
    }

    pub fn hint_line(&self) -> Option<u32> {
        self.breakpoints.hint_line(&self.anchors)
    }

    pub fn marker_state(&self, line: u32) -> Option<MarkerState> {
        self.breakpoints.state_at(&self.anchors, line)
    }

    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.canonical(&self.anchors)
    }

    pub fn is_report_pending(&self) -> bool {
        self.breakpoints.is_report_pending()
    }

    /// The coalescing window elapsed: queue the report if a toggle is pending.
    pub fn flush_breakpoints(&mut self) -> bool {
        match self.breakpoints.flush_pending(&self.anchors) {
            Some(list) => {
                self.outbox.push(HostEvent::breakpoints(&list));
                true
            }
            None => false,
        }
    }

    // ── runtime highlights and widgets ──

    pub fn set_highlight(&mut self, class: &str, payload: &str) -> Result<(), ConfigError> {
        let lines: LineList =
            serde_json::from_str(payload).map_err(ConfigError::malformed("highlight lines"))?;
        self.highlight_lines(class, &lines.into_vec());
        Ok(())
    }

    pub fn highlight_lines(&mut self, class: &str, lines: &[u32]) {
        self.highlights.set(&mut self.anchors, class, lines);
    }

    pub fn get_highlight(&self, class: &str) -> Vec<u32> {
        self.highlights.get(&self.anchors, class)
    }

    pub fn show_error(&mut self, line: u32, data: &str, text: &str) {
        self.widgets.show_error(&mut self.anchors, line, data, text);
    }

    pub fn show_code(&mut self, line: u32, data: &str, text: &str) {
        let grammar = self.context.grammar();
        self.widgets
            .show_code(&mut self.anchors, &grammar, line, data, text);
    }

    pub fn widgets(&self) -> &[Widget] {
        self.widgets.widgets()
    }

    pub fn widget_line(&self, widget: &Widget) -> Option<u32> {
        self.widgets.after_line(&self.anchors, widget)
    }

    pub fn clear_errors(&mut self) {
        self.widgets.clear_errors(&mut self.anchors);
    }

    /// End of a debug session: drop highlights and every widget.
    pub fn clear(&mut self) {
        self.highlights.clear(&mut self.anchors);
        self.widgets.clear(&mut self.anchors);
    }

    // ── user input ──

    pub fn cursor_line(&self) -> u32 {
        self.cursor_line
    }

    pub fn set_cursor(&mut self, line: u32) {
        self.cursor_line = line.max(1);
    }

    pub fn execute(&mut self, command: Command) {
        let line = Some(self.cursor_line.to_string());
        match command {
            Command::StartDebugging => self.fire(EditorEvent::StartDebugging, None),
            Command::StartDebuggingAtStep => self.fire(EditorEvent::StartDebuggingAtStep, line),
            Command::StartDebuggingAtStepAndContinue => {
                self.fire(EditorEvent::StartDebuggingAtStepAndContinue, line)
            }
            Command::StartDebuggingAtEntry => self.fire(EditorEvent::StartDebuggingAtEntry, None),
            Command::StepOver => self.fire(EditorEvent::StepOver, line),
            Command::ToggleBreakpoint => {
                self.toggle_breakpoint(self.cursor_line);
            }
        }
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn fire(&mut self, event: EditorEvent, payload: Option<String>) {
        debug!(event = event.as_str(), ?payload, "fire event");
        self.outbox.push(HostEvent::new(event, payload));
    }

    fn refresh(&mut self) {
        let text = self.content();
        self.tokens = self.context.grammar().tokenize(&text);
        self.problems = self
            .context
            .steps()
            .check_syntax(&text, &self.context.vocabulary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::TokenClass;
    use crate::markers::CURRENT;

    fn editor(text: &str) -> Editor {
        let mut e = Editor::default();
        e.set_keywords(r#"["given","when","then"]"#).unwrap();
        e.set_elements("{}", true).unwrap();
        e.set_content(text);
        e.drain_events();
        e
    }

    fn events(e: &mut Editor) -> Vec<(EditorEvent, Option<String>)> {
        e.drain_events()
            .into_iter()
            .map(|h| (h.event, h.payload))
            .collect()
    }

    // ── end to end ──

    #[test]
    fn load_catalog_and_toggle_breakpoint() {
        let mut e = editor("Given I open \"page\"\nThen done");
        e.set_step_list(
            r#"[{"insertText":"Given I open \"page\"","sortText":"a"}]"#,
            true,
        )
        .unwrap();
        let steps = e.context().steps();
        assert_eq!(steps.len(), 1);
        let step = steps.get("i open").unwrap();
        assert_eq!(step.label, r#"I open "page""#);
        assert_eq!(step.keyword, "given");

        assert!(e.toggle_breakpoint(1));
        assert_eq!(e.marker_state(1), Some(MarkerState::Unverified));
        assert!(events(&mut e).is_empty());
        assert!(e.flush_breakpoints());
        assert_eq!(
            events(&mut e),
            vec![(
                EditorEvent::UpdateBreakpoints,
                Some(r#"[{"lineNumber":1,"enable":true}]"#.to_string())
            )]
        );

        assert!(!e.toggle_breakpoint(1));
        assert!(e.flush_breakpoints());
        assert_eq!(
            events(&mut e),
            vec![(EditorEvent::UpdateBreakpoints, Some("[]".to_string()))]
        );
    }

    // ── document ──

    #[test]
    fn step_list_rechecks_document() {
        let mut e = editor("Given I open \"x\"\nWhen I fly");
        assert_eq!(e.problems().len(), 2);
        e.set_step_list(r#"[{"insertText":"Given I open <page>"}]"#, true)
            .unwrap();
        assert_eq!(
            e.problems(),
            &[Problem {
                line_number: 2,
                message: "Unknown step".into()
            }]
        );
        e.set_syntax_message("No such step");
        assert_eq!(e.problems()[0].message, "No such step");
    }

    #[test]
    fn keywords_retokenize_document() {
        let mut e = editor("Допустим я открыл");
        assert_ne!(e.tokens()[0].tokens[0].class, TokenClass::Keyword);
        e.set_keywords(r#"["допустим"]"#).unwrap();
        assert_eq!(e.tokens()[0].tokens[0].class, TokenClass::Keyword);
    }

    #[test]
    fn bad_payload_keeps_state() {
        let mut e = editor("Given x");
        assert!(e.set_keywords("not json").is_err());
        assert!(e.decorate_breakpoints(r#"[{"line": 1}]"#).is_err());
        assert!(e.set_error_links("{}").is_err());
        assert!(e.set_highlight(CURRENT, r#""one""#).is_err());
        assert_eq!(e.tokens()[0].tokens[0].class, TokenClass::Keyword);
    }

    #[test]
    fn edits_fire_content_change_then_drift() {
        let mut e = editor("a\nb\nc\nd");
        e.decorate_breakpoints(r#"[{"lineNumber":3,"enable":true}]"#)
            .unwrap();
        e.apply_edit(2, 1, vec!["b".into(), "b2".into()]);
        assert_eq!(e.content(), "a\nb\nb2\nc\nd");
        assert_eq!(
            events(&mut e),
            vec![
                (EditorEvent::ContentDidChange, None),
                (
                    EditorEvent::UpdateBreakpoints,
                    Some(r#"[{"lineNumber":4,"enable":true}]"#.to_string())
                ),
            ]
        );
        e.apply_edit(1, 1, vec!["A".into()]);
        assert_eq!(events(&mut e), vec![(EditorEvent::ContentDidChange, None)]);
    }

    #[test]
    fn deleting_lines_collapses_breakpoints() {
        let mut e = editor("1\n2\n3\n4\n5\n6\n7\n8");
        e.decorate_breakpoints(
            r#"[{"lineNumber":5,"enable":true},{"lineNumber":6,"enable":false},{"lineNumber":8,"enable":true}]"#,
        )
        .unwrap();
        e.apply_edit(5, 1, vec![]);
        e.apply_edit(7, 0, vec!["x".into()]);
        let last = e.drain_events().pop().unwrap();
        assert_eq!(
            last.payload.as_deref(),
            Some(r#"[{"lineNumber":5,"enable":true},{"lineNumber":8,"enable":true}]"#)
        );
    }

    // ── host push ──

    #[test]
    fn host_push_cancels_pending_report() {
        let mut e = editor("a\nb");
        e.toggle_breakpoint(1);
        assert!(e.is_report_pending());
        e.decorate_breakpoints(r#"[{"lineNumber":2,"enable":false}]"#)
            .unwrap();
        assert!(!e.flush_breakpoints());
        assert_eq!(e.breakpoints(), vec![Breakpoint::new(2, false)]);
        assert_eq!(e.marker_state(2), Some(MarkerState::Verified));
    }

    #[test]
    fn highlights_and_widgets() {
        let mut e = editor("Given a\nGiven b\nGiven c");
        e.set_highlight(CURRENT, "1").unwrap();
        e.set_highlight("complete", "[1]").unwrap();
        e.set_highlight(CURRENT, "[2]").unwrap();
        assert_eq!(e.get_highlight("complete"), vec![1]);
        assert_eq!(e.get_highlight(CURRENT), vec![2]);

        e.set_error_links(r#"[{"id":"copy","title":"Copy"}]"#).unwrap();
        e.show_error(2, "d", "failed");
        e.show_code(2, "d", "Given a\nGiven b");
        assert_eq!(e.widgets().len(), 2);
        assert_eq!(e.widget_line(&e.widgets()[0]), Some(2));

        e.clear_errors();
        assert_eq!(e.widgets().len(), 1);
        e.clear();
        assert!(e.widgets().is_empty());
        assert!(e.get_highlight("complete").is_empty());
    }

    // ── commands ──

    #[test]
    fn commands_use_cursor_line() {
        let mut e = editor("a\nb\nc");
        e.set_cursor(3);
        e.execute(Command::StartDebugging);
        e.execute(Command::StartDebuggingAtStep);
        e.execute(Command::StartDebuggingAtStepAndContinue);
        e.execute(Command::StartDebuggingAtEntry);
        e.execute(Command::StepOver);
        let three = Some("3".to_string());
        assert_eq!(
            events(&mut e),
            vec![
                (EditorEvent::StartDebugging, None),
                (EditorEvent::StartDebuggingAtStep, three.clone()),
                (EditorEvent::StartDebuggingAtStepAndContinue, three.clone()),
                (EditorEvent::StartDebuggingAtEntry, None),
                (EditorEvent::StepOver, three),
            ]
        );

        e.execute(Command::ToggleBreakpoint);
        assert_eq!(e.marker_state(3), Some(MarkerState::Unverified));
    }

    #[test]
    fn hover_hint_is_transient() {
        let mut e = editor("a\nb");
        e.hover_gutter(Some(2));
        assert_eq!(e.hint_line(), Some(2));
        e.hover_gutter(None);
        assert_eq!(e.hint_line(), None);
        assert!(e.breakpoints().is_empty());
    }

    #[test]
    fn hover_hint_moves_with_edits() {
        let mut e = editor("a\nb");
        e.hover_gutter(Some(2));
        e.apply_edit(1, 0, vec!["x".into(), "y".into()]);
        assert_eq!(e.hint_line(), Some(4));
    }

    // ── content ──

    #[test]
    fn content_keeps_line_endings() {
        let mut e = Editor::default();
        for text in ["a\nb", "a\nb\n", "a\r\nb\r\n", "a\r\nb", "", "\n"] {
            e.set_content(text);
            assert_eq!(e.content(), text, "{text:?}");
        }
    }

    #[test]
    fn edits_reuse_line_ending() {
        let mut e = editor("a\r\nb\r\n");
        e.apply_edit(3, 0, vec!["c".into()]);
        assert_eq!(e.content(), "a\r\nb\r\nc\r\n");
    }
}
