//! Keyword, element and variable tables.
//!
//! A [`Vocabulary`] is an immutable snapshot. Writers build a new snapshot
//! from the current one and publish it as a whole (see
//! [`crate::context::EditorContext`]); readers such as the grammar hold an
//! `Arc<Vocabulary>` and never observe a half-applied update.

use std::collections::HashMap;

use serde::Serialize;

/// A runtime variable binding, keyed by its lower-cased name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    /// Keyword phrases as lower-cased word sequences, longest first.
    keywords: Vec<Vec<String>>,
    elements: HashMap<String, String>,
    variables: HashMap<String, Variable>,
    syntax_message: String,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with the keyword phrases replaced.
    ///
    /// Phrases are case-folded and split on whitespace. The result is sorted
    /// by descending word count; the sort is stable so equal-length phrases
    /// keep their payload order.
    pub fn with_keywords<S: AsRef<str>>(&self, phrases: &[S]) -> Self {
        let mut keywords: Vec<Vec<String>> = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            let words: Vec<String> = phrase
                .as_ref()
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if words.is_empty() || keywords.contains(&words) {
                continue;
            }
            keywords.push(words);
        }
        keywords.sort_by(|a, b| b.len().cmp(&a.len()));
        Self {
            keywords,
            ..self.clone()
        }
    }

    /// Snapshot with elements merged in (or replacing, when `clear`).
    pub fn with_elements(&self, entries: Vec<(String, String)>, clear: bool) -> Self {
        let mut elements = if clear {
            HashMap::new()
        } else {
            self.elements.clone()
        };
        for (name, value) in entries {
            elements.insert(name.to_lowercase(), value);
        }
        Self {
            elements,
            ..self.clone()
        }
    }

    /// Snapshot with variables merged in (or replacing, when `clear`).
    pub fn with_variables(&self, entries: Vec<(String, String)>, clear: bool) -> Self {
        let mut variables = if clear {
            HashMap::new()
        } else {
            self.variables.clone()
        };
        for (name, value) in entries {
            variables.insert(name.to_lowercase(), Variable { name, value });
        }
        Self {
            variables,
            ..self.clone()
        }
    }

    pub fn with_syntax_message(&self, message: &str) -> Self {
        Self {
            syntax_message: message.to_string(),
            ..self.clone()
        }
    }

    pub fn keywords(&self) -> &[Vec<String>] {
        &self.keywords
    }

    pub fn syntax_message(&self) -> &str {
        &self.syntax_message
    }

    pub fn element(&self, name: &str) -> Option<&str> {
        self.elements.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(&name.to_lowercase())
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Display value for a placeholder name: elements first, then variables.
    pub fn substitution(&self, name: &str) -> Option<&str> {
        self.element(name)
            .or_else(|| self.variable(name).map(|v| v.value.as_str()))
    }

    /// Number of leading `words` that form the longest keyword phrase.
    ///
    /// Comparison is case-insensitive. Returns `None` when no phrase matches.
    pub fn match_keyword<S: AsRef<str>>(&self, words: &[S]) -> Option<usize> {
        self.keywords
            .iter()
            .find(|phrase| {
                phrase.len() <= words.len()
                    && phrase
                        .iter()
                        .zip(words)
                        .all(|(k, w)| w.as_ref().to_lowercase() == *k)
            })
            .map(Vec::len)
    }

    /// Whether a single word is itself a one-word keyword.
    pub fn is_single_keyword(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.keywords
            .iter()
            .any(|phrase| phrase.len() == 1 && phrase[0] == word)
    }
}
