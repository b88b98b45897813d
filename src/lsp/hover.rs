//! Hover and completion content for catalogued steps.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Documentation, MarkupContent,
    MarkupKind, Range, TextEdit,
};

use crate::steps::StepDefinition;

/// Format a step as markdown for a hover tooltip.
pub fn build_hover_content(step: &StepDefinition) -> String {
    let mut parts = vec![format!("## {}", step.label)];

    if !step.keyword.is_empty() || !step.section.is_empty() {
        let mut line = format!("*{}*", step.keyword);
        if !step.section.is_empty() {
            line.push_str(&format!(" | {}", step.section));
        }
        parts.push(line);
    }

    if !step.body.is_empty() {
        parts.push(format!("```\n{}\n```", step.body.join("\n")));
    }

    if !step.documentation.is_empty() {
        parts.push(step.documentation.clone());
    }

    parts.join("\n\n")
}

/// LSP completion kind for a host-supplied kind number (1 to 25).
fn completion_kind(kind: u32) -> CompletionItemKind {
    if !(1..=25).contains(&kind) {
        return CompletionItemKind::FUNCTION;
    }
    serde_json::from_value(serde_json::Value::from(kind)).unwrap_or(CompletionItemKind::FUNCTION)
}

/// A completion item that replaces `range` with the step's insert text.
pub fn build_completion_item(step: &StepDefinition, range: Range) -> CompletionItem {
    CompletionItem {
        label: step.label.clone(),
        kind: Some(completion_kind(step.kind)),
        detail: (!step.section.is_empty()).then(|| step.section.clone()),
        documentation: (!step.documentation.is_empty()).then(|| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: step.documentation.clone(),
            })
        }),
        filter_text: Some(step.filter_text.clone()),
        sort_text: (!step.sort_text.is_empty()).then(|| step.sort_text.clone()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range,
            new_text: step.insert_text.clone(),
        })),
        ..Default::default()
    }
}
