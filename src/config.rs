//! Editor configuration.
//!
//! Read from a JSON file for the CLI modes or from the LSP
//! `initializationOptions`. Every field has a default; unknown fields are
//! ignored so hosts can share one settings blob.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

pub const DEFAULT_REPORT_DELAY_MS: u64 = 100;
pub const DEFAULT_DIAGNOSTICS_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Coalescing window for breakpoint reports after a toggle.
    pub report_delay_ms: u64,
    /// Debounce for re-checking a document after edits (LSP).
    pub diagnostics_delay_ms: u64,
    /// Words recognised as keywords whatever the host vocabulary says.
    pub builtin_keywords: Vec<String>,
    /// Initial payloads, in the same shapes the host sends.
    pub keywords: Option<Value>,
    pub elements: Option<Value>,
    pub variables: Option<Value>,
    pub steps: Option<Value>,
    pub syntax_message: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            report_delay_ms: DEFAULT_REPORT_DELAY_MS,
            diagnostics_delay_ms: DEFAULT_DIAGNOSTICS_DELAY_MS,
            builtin_keywords: vec!["if".to_string()],
            keywords: None,
            elements: None,
            variables: None,
            steps: None,
            syntax_message: None,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(ConfigError::malformed("config"))
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(ConfigError::malformed("config"))
    }
}
