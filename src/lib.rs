//! Gherkin-Lens: editing support for behavior-style step scripts
//!
//! This library tokenizes scripts against a live keyword vocabulary, keeps a
//! catalog of reusable steps for completion, and tracks breakpoint and
//! runtime-highlight markers across edits. It is driven by a host through
//! the JSON-lines bridge in [`host`] or through the language server in
//! [`lsp`], and can also be used directly from Rust.

pub mod config;
pub mod context;
pub mod editor;
pub mod error;
pub mod format;
pub mod grammar;
pub mod host;
pub mod lsp;
pub mod markers;
pub mod model;
pub mod steps;
pub mod vocab;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::EditorConfig;
use crate::context::EditorContext;

/// Payload files applied on top of a config when building a context.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadFiles<'a> {
    pub keywords: Option<&'a Path>,
    pub elements: Option<&'a Path>,
    pub variables: Option<&'a Path>,
    pub steps: Option<&'a Path>,
}

fn read_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Build a context from `config`, then apply any payload files.
///
/// Payload files replace the corresponding config entries.
pub fn load_context(config: &EditorConfig, files: PayloadFiles<'_>) -> Result<EditorContext> {
    let mut context = EditorContext::from_config(config)?;
    if let Some(path) = files.keywords {
        context
            .set_keywords(&read_payload(path)?)
            .with_context(|| format!("in {}", path.display()))?;
    }
    if let Some(path) = files.elements {
        context
            .set_elements(&read_payload(path)?, true)
            .with_context(|| format!("in {}", path.display()))?;
    }
    if let Some(path) = files.variables {
        context
            .set_variables(&read_payload(path)?, true)
            .with_context(|| format!("in {}", path.display()))?;
    }
    if let Some(path) = files.steps {
        context
            .set_step_list(&read_payload(path)?, true)
            .with_context(|| format!("in {}", path.display()))?;
    }
    Ok(context)
}

/// Tokenize a script; lines are numbered from 1.
pub fn tokenize_text(context: &EditorContext, text: &str) -> Vec<model::TokenLine> {
    let grammar = context.grammar();
    text.lines()
        .zip(grammar.tokenize(text))
        .enumerate()
        .map(|(index, (line, tokens))| model::TokenLine {
            line: index as u32 + 1,
            tokens: tokens
                .tokens
                .iter()
                .map(|t| model::TokenEntry {
                    text: t.text(line).to_string(),
                    class: t.class.as_str().to_string(),
                })
                .collect(),
        })
        .collect()
}

/// The catalog as output entries, grouped by section.
pub fn step_entries(context: &EditorContext) -> Vec<model::StepEntry> {
    let mut entries: Vec<model::StepEntry> = context
        .steps()
        .sorted()
        .into_iter()
        .map(|s| model::StepEntry {
            key: s.key.clone(),
            keyword: s.keyword.clone(),
            label: s.label.clone(),
            insert_text: s.insert_text.clone(),
            section: s.section.clone(),
            sort_text: s.sort_text.clone(),
            documentation: s.documentation.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.section.cmp(&b.section));
    entries
}

/// Check a script file against the catalog.
pub fn check_file(context: &EditorContext, path: &Path) -> Result<Vec<model::Problem>> {
    let text = read_payload(path)?;
    Ok(context.steps().check_syntax(&text, &context.vocabulary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_context_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = write_file(&dir, "k.json", r#"["given", "when"]"#);
        let elements = write_file(&dir, "e.json", r#"{"page": "Home"}"#);
        let steps = write_file(
            &dir,
            "s.json",
            r#"[{"insertText": "Given I open \"page\"", "section": "Nav"},
                {"insertText": "When I wait"}]"#,
        );
        let context = load_context(
            &EditorConfig::default(),
            PayloadFiles {
                keywords: Some(&keywords),
                elements: Some(&elements),
                steps: Some(&steps),
                ..Default::default()
            },
        )
        .unwrap();

        let entries = step_entries(&context);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "I wait");
        assert_eq!(entries[1].label, "I open \"Home\"");
        assert_eq!(entries[1].section, "Nav");

        let script = write_file(&dir, "a.feature", "Given I open \"x\"\nWhen I run");
        let problems = check_file(&context, &script).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].line_number, 2);
    }

    #[test]
    fn keyword_file_rekeys_config_steps() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = write_file(&dir, "k.json", r#"["given"]"#);
        let config = EditorConfig::from_value(serde_json::json!({
            "steps": [{"insertText": "Given I open \"page\""}]
        }))
        .unwrap();
        let context = load_context(
            &config,
            PayloadFiles {
                keywords: Some(&keywords),
                ..Default::default()
            },
        )
        .unwrap();

        let script = write_file(&dir, "a.feature", "Given I open \"x\"");
        assert!(check_file(&context, &script).unwrap().is_empty());
    }

    #[test]
    fn load_context_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = write_file(&dir, "k.json", "{");
        let err = load_context(
            &EditorConfig::default(),
            PayloadFiles {
                keywords: Some(&keywords),
                ..Default::default()
            },
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("k.json"));
        assert!(message.contains("malformed keywords payload"));

        let missing = dir.path().join("none.json");
        assert!(load_context(
            &EditorConfig::default(),
            PayloadFiles {
                steps: Some(&missing),
                ..Default::default()
            },
        )
        .is_err());
    }

    #[test]
    fn tokenize_numbers_lines() {
        let context = EditorContext::default();
        let lines = tokenize_text(&context, "if x\n\n# note");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].tokens[0].class, "keyword");
        assert_eq!(lines[0].tokens[0].text, "if");
        assert!(lines[1].tokens.is_empty());
        assert_eq!(lines[2].line, 3);
        assert_eq!(lines[2].tokens[0].class, "comment");
    }
}
