use serde::{Deserialize, Serialize};

/// A breakpoint as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub line_number: u32,
    pub enable: bool,
}

impl Breakpoint {
    pub fn new(line_number: u32, enable: bool) -> Self {
        Self {
            line_number,
            enable,
        }
    }
}

/// One entry of a host step list.
///
/// The first line of `insert_text` is the matchable phrase; further lines
/// (typically a data table) form the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepPayload {
    pub insert_text: String,
    pub filter_text: String,
    pub sort_text: String,
    pub documentation: String,
    pub kind: u32,
    pub section: String,
}

/// Line argument of a highlight push: one line or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LineList {
    One(u32),
    Many(Vec<u32>),
}

impl LineList {
    pub fn into_vec(self) -> Vec<u32> {
        match self {
            LineList::One(line) => vec![line],
            LineList::Many(lines) => lines,
        }
    }
}

/// A link rendered under each inline error panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLink {
    pub id: String,
    pub title: String,
}

/// Events sent from the editor core to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditorEvent {
    StartDebugging,
    StartDebuggingAtStep,
    StartDebuggingAtStepAndContinue,
    StartDebuggingAtEntry,
    UpdateBreakpoints,
    StepOver,
    ContentDidChange,
}

impl EditorEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorEvent::StartDebugging => "START_DEBUGGING",
            EditorEvent::StartDebuggingAtStep => "START_DEBUGGING_AT_STEP",
            EditorEvent::StartDebuggingAtStepAndContinue => "START_DEBUGGING_AT_STEP_AND_CONTINUE",
            EditorEvent::StartDebuggingAtEntry => "START_DEBUGGING_AT_ENTRY",
            EditorEvent::UpdateBreakpoints => "UPDATE_BREAKPOINTS",
            EditorEvent::StepOver => "STEP_OVER",
            EditorEvent::ContentDidChange => "CONTENT_DID_CHANGE",
        }
    }
}

impl std::str::FromStr for EditorEvent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START_DEBUGGING" => Ok(EditorEvent::StartDebugging),
            "START_DEBUGGING_AT_STEP" => Ok(EditorEvent::StartDebuggingAtStep),
            "START_DEBUGGING_AT_STEP_AND_CONTINUE" => Ok(EditorEvent::StartDebuggingAtStepAndContinue),
            "START_DEBUGGING_AT_ENTRY" => Ok(EditorEvent::StartDebuggingAtEntry),
            "UPDATE_BREAKPOINTS" => Ok(EditorEvent::UpdateBreakpoints),
            "STEP_OVER" => Ok(EditorEvent::StepOver),
            "CONTENT_DID_CHANGE" => Ok(EditorEvent::ContentDidChange),
            _ => Err(()),
        }
    }
}

/// A fired event: name plus string payload, the single outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostEvent {
    pub event: EditorEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl HostEvent {
    pub fn new(event: EditorEvent, payload: Option<String>) -> Self {
        Self { event, payload }
    }

    pub fn breakpoints(list: &[Breakpoint]) -> Self {
        // Serializing plain structs of integers and booleans cannot fail.
        let payload = serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string());
        Self::new(EditorEvent::UpdateBreakpoints, Some(payload))
    }
}

/// A line whose step is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub line_number: u32,
    pub message: String,
}

/// JSON output for the steps command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEntry {
    pub key: String,
    pub keyword: String,
    pub label: String,
    pub insert_text: String,
    pub section: String,
    pub sort_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,
}

/// JSON output for the tokenize command
#[derive(Debug, Serialize)]
pub struct TokenLine {
    pub line: u32,
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Serialize)]
pub struct TokenEntry {
    pub text: String,
    #[serde(rename = "type")]
    pub class: String,
}
