//! Per-editor tables: vocabulary snapshot, grammar and step catalog.
//!
//! Each editor instance owns one context, so two editors never share
//! keyword or element tables. Every `set_*` call parses its payload in full
//! before anything changes; a malformed payload returns an error and leaves
//! the previous tables in place.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::error::ConfigError;
use crate::grammar::Grammar;
use crate::model::StepPayload;
use crate::steps::StepCatalog;
use crate::vocab::Vocabulary;

#[derive(Debug, Clone)]
pub struct EditorContext {
    vocabulary: Arc<Vocabulary>,
    grammar: Arc<Grammar>,
    steps: StepCatalog,
    builtin_keywords: Vec<String>,
    host_keywords: Vec<String>,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(EditorConfig::default().builtin_keywords)
    }
}

impl EditorContext {
    pub fn new(builtin_keywords: Vec<String>) -> Self {
        let vocabulary = Arc::new(Vocabulary::new().with_keywords(&builtin_keywords));
        Self {
            grammar: Arc::new(Grammar::new(Arc::clone(&vocabulary))),
            vocabulary,
            steps: StepCatalog::new(),
            builtin_keywords,
            host_keywords: Vec::new(),
        }
    }

    /// Build a context and apply the initial payloads from `config`.
    pub fn from_config(config: &EditorConfig) -> Result<Self, ConfigError> {
        let mut context = Self::new(config.builtin_keywords.clone());
        if let Some(keywords) = &config.keywords {
            context.set_keywords(&keywords.to_string())?;
        }
        if let Some(elements) = &config.elements {
            context.set_elements(&elements.to_string(), true)?;
        }
        if let Some(variables) = &config.variables {
            context.set_variables(&variables.to_string(), true)?;
        }
        if let Some(message) = &config.syntax_message {
            context.set_syntax_message(message);
        }
        if let Some(steps) = &config.steps {
            context.set_step_list(&steps.to_string(), true)?;
        }
        Ok(context)
    }

    /// Current vocabulary snapshot.
    pub fn vocabulary(&self) -> Arc<Vocabulary> {
        Arc::clone(&self.vocabulary)
    }

    /// Grammar built from the current snapshot.
    pub fn grammar(&self) -> Arc<Grammar> {
        Arc::clone(&self.grammar)
    }

    pub fn steps(&self) -> &StepCatalog {
        &self.steps
    }

    pub fn set_keywords(&mut self, payload: &str) -> Result<(), ConfigError> {
        let list: Vec<String> =
            serde_json::from_str(payload).map_err(ConfigError::malformed("keywords"))?;
        debug!(count = list.len(), "keywords updated");
        self.host_keywords = list;
        let mut phrases = self.host_keywords.clone();
        phrases.extend(self.builtin_keywords.iter().cloned());
        let next = self.vocabulary.with_keywords(&phrases);
        self.publish(next);
        Ok(())
    }

    pub fn set_elements(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        let entries = parse_table(payload, "elements")?;
        debug!(count = entries.len(), clear, "elements updated");
        let next = self.vocabulary.with_elements(entries, clear);
        self.publish(next);
        Ok(())
    }

    pub fn set_variables(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        let entries = parse_table(payload, "variables")?;
        debug!(count = entries.len(), clear, "variables updated");
        let next = self.vocabulary.with_variables(entries, clear);
        self.publish(next);
        Ok(())
    }

    pub fn set_step_list(&mut self, payload: &str, clear: bool) -> Result<(), ConfigError> {
        let list: Vec<StepPayload> =
            serde_json::from_str(payload).map_err(ConfigError::malformed("step list"))?;
        self.steps.extend(list, clear, &self.vocabulary);
        self.steps.recompute_labels(&self.vocabulary);
        info!(steps = self.steps.len(), "step list loaded");
        Ok(())
    }

    pub fn set_syntax_message(&mut self, message: &str) {
        let next = self.vocabulary.with_syntax_message(message);
        self.vocabulary = Arc::new(next);
        self.grammar = Arc::new(Grammar::new(Arc::clone(&self.vocabulary)));
    }

    /// Swap in a new snapshot, rebuild the grammar and relabel every step.
    fn publish(&mut self, vocabulary: Vocabulary) {
        self.vocabulary = Arc::new(vocabulary);
        self.grammar = Arc::new(Grammar::new(Arc::clone(&self.vocabulary)));
        self.steps.recompute_labels(&self.vocabulary);
    }
}

/// Parse a `{name: value}` payload; non-string values use their JSON text.
fn parse_table(payload: &str, what: &'static str) -> Result<Vec<(String, String)>, ConfigError> {
    let map: Map<String, Value> =
        serde_json::from_str(payload).map_err(ConfigError::malformed(what))?;
    Ok(map
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}
