//! The step catalog: reusable phrases keyed by their literal words.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::words::{split_words, step_key, substitute};
use crate::model::{Problem, StepPayload};
use crate::vocab::Vocabulary;

const DEFAULT_SYNTAX_MESSAGE: &str = "Unknown step";

/// One reusable phrase.
///
/// `label`, `keyword` and `insert_text` are derived from `head`, `body` and
/// the current vocabulary; [`StepCatalog::recompute_labels`] refreshes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub key: String,
    pub head: Vec<String>,
    pub body: Vec<String>,
    pub documentation: String,
    pub filter_text: String,
    pub sort_text: String,
    pub section: String,
    pub kind: u32,
    pub label: String,
    pub keyword: String,
    pub insert_text: String,
    /// Load order; on a key collision the later step wins.
    pub order: u64,
}

impl StepDefinition {
    fn from_payload(payload: StepPayload, order: u64, vocabulary: &Vocabulary) -> Option<Self> {
        let mut lines = payload.insert_text.split('\n');
        let first = lines.next().unwrap_or_default().trim_end_matches('\r');
        let head = split_words(first);
        if head.is_empty() {
            return None;
        }
        let body: Vec<String> = lines
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        let filter_text = if payload.filter_text.is_empty() {
            head.join(" ")
        } else {
            payload.filter_text
        };
        let mut step = Self {
            key: String::new(),
            head,
            body,
            documentation: payload.documentation,
            filter_text,
            sort_text: payload.sort_text,
            section: payload.section,
            kind: payload.kind,
            label: String::new(),
            keyword: String::new(),
            insert_text: payload.insert_text,
            order,
        };
        step.relabel(vocabulary);
        Some(step)
    }

    /// Recompute the key and the derived fields against `vocabulary`.
    fn relabel(&mut self, vocabulary: &Vocabulary) {
        self.key = step_key(&self.head, vocabulary);
        let words: Vec<String> = self
            .head
            .iter()
            .map(|w| substitute(w, vocabulary))
            .collect();
        let split = vocabulary.match_keyword(&words).unwrap_or(0);
        self.keyword = words[..split]
            .iter()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        self.label = words[split..].join(" ");
        self.insert_text = if self.body.is_empty() {
            self.label.clone()
        } else {
            format!("{}\n{}", self.label, self.body.join("\n"))
        };
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    entries: HashMap<String, StepDefinition>,
    loaded: u64,
}

impl StepCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&StepDefinition> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store payload entries under their canonical keys; later entries win.
    pub fn extend(&mut self, payloads: Vec<StepPayload>, clear: bool, vocabulary: &Vocabulary) {
        if clear {
            self.entries.clear();
        }
        for payload in payloads {
            let source = payload.insert_text.clone();
            self.loaded += 1;
            match StepDefinition::from_payload(payload, self.loaded, vocabulary) {
                Some(step) => {
                    self.entries.insert(step.key.clone(), step);
                }
                None => warn!(insert_text = %source, "skipping step with empty text"),
            }
        }
    }

    /// Relabel and re-key every step.
    ///
    /// Keys depend on the keyword vocabulary, so a keyword change can move
    /// or merge entries; merged keys keep the most recently loaded step.
    pub fn recompute_labels(&mut self, vocabulary: &Vocabulary) {
        let mut steps: Vec<StepDefinition> = self.entries.drain().map(|(_, s)| s).collect();
        steps.sort_by_key(|s| s.order);
        for mut step in steps {
            step.relabel(vocabulary);
            if let Some(replaced) = self.entries.insert(step.key.clone(), step) {
                debug!(key = %replaced.key, "step merged on re-key");
            }
        }
    }

    /// All steps ordered by sort text, then label.
    pub fn sorted(&self) -> Vec<&StepDefinition> {
        let mut steps: Vec<&StepDefinition> = self.entries.values().collect();
        steps.sort_by(|a, b| {
            (a.sort_text.as_str(), a.label.as_str(), a.key.as_str()).cmp(&(
                b.sort_text.as_str(),
                b.label.as_str(),
                b.key.as_str(),
            ))
        });
        steps
    }

    /// The catalogued step a script line refers to.
    pub fn step_for_line(&self, line: &str, vocabulary: &Vocabulary) -> Option<&StepDefinition> {
        let words = split_words(line);
        if words.is_empty() {
            return None;
        }
        self.get(&step_key(&words, vocabulary))
    }

    /// Completion candidates for the text typed so far on a line.
    ///
    /// The leading keyword is ignored; every remaining typed word must occur
    /// in the step's filter text or label.
    pub fn suggest(&self, typed: &str, vocabulary: &Vocabulary) -> Vec<&StepDefinition> {
        let words = split_words(typed);
        let skip = vocabulary.match_keyword(&words).unwrap_or(0);
        let needles: Vec<String> = words[skip..].iter().map(|w| w.to_lowercase()).collect();
        self.sorted()
            .into_iter()
            .filter(|step| {
                let hay = format!("{} {}", step.filter_text, step.label).to_lowercase();
                needles.iter().all(|n| hay.contains(n.as_str()))
            })
            .collect()
    }

    /// Lines that start with a keyword but name no catalogued step.
    pub fn check_syntax(&self, text: &str, vocabulary: &Vocabulary) -> Vec<Problem> {
        let message = if vocabulary.syntax_message().is_empty() {
            DEFAULT_SYNTAX_MESSAGE
        } else {
            vocabulary.syntax_message()
        };
        let mut problems = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let words = split_words(line);
            let Some(keyword_len) = vocabulary.match_keyword(&words) else {
                continue;
            };
            if keyword_len == words.len() {
                continue;
            }
            if !self.contains_key(&step_key(&words, vocabulary)) {
                problems.push(Problem {
                    line_number: index as u32 + 1,
                    message: message.to_string(),
                });
            }
        }
        problems
    }
}
