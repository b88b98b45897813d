//! Markdown output formatters for CLI commands

use crate::model::{Problem, StepEntry, TokenLine};

/// Format tokenized lines as markdown
pub fn tokens(lines: &[TokenLine]) -> String {
    let mut md = String::new();

    for line in lines {
        md.push_str(&format!("## Line {}\n\n", line.line));
        if line.tokens.is_empty() {
            md.push_str("*(empty)*\n\n");
            continue;
        }
        for token in &line.tokens {
            md.push_str(&format!("- `{}` {}\n", token.class, inline_code(&token.text)));
        }
        md.push('\n');
    }

    md
}

/// Format the step catalog as markdown, grouped by section
pub fn steps(entries: &[StepEntry]) -> String {
    let mut md = format!("# Steps ({})\n\n", entries.len());

    let mut section: Option<&str> = None;
    for entry in entries {
        if section != Some(entry.section.as_str()) {
            section = Some(entry.section.as_str());
            let title = if entry.section.is_empty() {
                "(no section)"
            } else {
                entry.section.as_str()
            };
            md.push_str(&format!("## {}\n\n", title));
        }
        if entry.keyword.is_empty() {
            md.push_str(&format!("- {}\n", entry.label));
        } else {
            md.push_str(&format!("- **{}** {}\n", entry.keyword, entry.label));
        }
        md.push_str(&format!("  - key: `{}`\n", entry.key));
        if !entry.documentation.is_empty() {
            md.push_str(&format!("  - {}\n", entry.documentation));
        }
    }

    md
}

/// Format syntax-check problems as markdown
pub fn problems(problems: &[Problem]) -> String {
    if problems.is_empty() {
        return "No problems found.\n".to_string();
    }
    let mut md = format!("# Problems ({})\n\n", problems.len());
    for p in problems {
        md.push_str(&format!("- line {}: {}\n", p.line_number, p.message));
    }
    md
}

/// Wrap text in backticks, widening the fence if the text contains one.
fn inline_code(text: &str) -> String {
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenEntry;

    fn entry(section: &str, keyword: &str, label: &str) -> StepEntry {
        StepEntry {
            key: label.to_lowercase(),
            keyword: keyword.to_string(),
            label: label.to_string(),
            insert_text: label.to_string(),
            section: section.to_string(),
            sort_text: String::new(),
            documentation: String::new(),
        }
    }

    #[test]
    fn format_tokens() {
        let lines = vec![
            TokenLine {
                line: 1,
                tokens: vec![
                    TokenEntry {
                        text: "Given".into(),
                        class: "keyword".into(),
                    },
                    TokenEntry {
                        text: "a`b".into(),
                        class: "identifier".into(),
                    },
                ],
            },
            TokenLine {
                line: 2,
                tokens: vec![],
            },
        ];
        let md = tokens(&lines);
        assert!(md.contains("## Line 1"));
        assert!(md.contains("- `keyword` `Given`"));
        assert!(md.contains("`` a`b ``"));
        assert!(md.contains("## Line 2\n\n*(empty)*"));
    }

    #[test]
    fn format_steps_groups_sections() {
        let mut docs = entry("Navigation", "given", "I open \"page\"");
        docs.documentation = "Opens a page.".into();
        let entries = vec![
            entry("", "", "Suppose I wait"),
            docs,
            entry("Navigation", "when", "I go back"),
        ];
        let md = steps(&entries);
        assert!(md.starts_with("# Steps (3)"));
        assert!(md.contains("## (no section)\n\n- Suppose I wait"));
        assert_eq!(md.matches("## Navigation").count(), 1);
        assert!(md.contains("- **given** I open \"page\""));
        assert!(md.contains("  - Opens a page."));
    }

    #[test]
    fn format_problems() {
        assert_eq!(problems(&[]), "No problems found.\n");
        let md = problems(&[Problem {
            line_number: 4,
            message: "Unknown step".into(),
        }]);
        assert!(md.contains("# Problems (1)"));
        assert!(md.contains("- line 4: Unknown step"));
    }
}
