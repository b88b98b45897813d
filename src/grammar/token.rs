//! Token classes and tokenizer state.

use serde::Serialize;

/// Highlighting class of a token span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenClass {
    /// `Heading:` whose word is a one-word keyword.
    Section,
    Keyword,
    Identifier,
    Emphasis,
    Strong,
    Annotation,
    Operator,
    White,
    Comment,
    Number,
    String,
    StringEscape,
    StringEscapeInvalid,
    /// Literal with no closing delimiter on its line.
    StringInvalid,
    /// Characters no rule claims inside an operator or parameter row.
    Text,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Section => "metatag",
            TokenClass::Keyword => "keyword",
            TokenClass::Identifier => "identifier",
            TokenClass::Emphasis => "emphasis",
            TokenClass::Strong => "strong",
            TokenClass::Annotation => "annotation",
            TokenClass::Operator => "operator",
            TokenClass::White => "white",
            TokenClass::Comment => "comment",
            TokenClass::Number => "number",
            TokenClass::String => "string",
            TokenClass::StringEscape => "string.escape",
            TokenClass::StringEscapeInvalid => "string.escape.invalid",
            TokenClass::StringInvalid => "string.invalid",
            TokenClass::Text => "text",
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            TokenClass::String
                | TokenClass::StringEscape
                | TokenClass::StringEscapeInvalid
                | TokenClass::StringInvalid
        )
    }
}

/// Tokenizer mode. `Root` is always at the bottom of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Root,
    /// After a keyword: remaining words are identifiers until line end.
    Operator,
    /// Inside a `|` table row until line end.
    Params,
    DoubleQuoted,
    SingleQuoted,
    Angled,
}

impl Mode {
    /// Modes that end with their line.
    pub fn ends_with_line(&self) -> bool {
        matches!(self, Mode::Operator | Mode::Params)
    }

    pub fn closing_delimiter(&self) -> Option<char> {
        match self {
            Mode::DoubleQuoted => Some('"'),
            Mode::SingleQuoted => Some('\''),
            Mode::Angled => Some('>'),
            _ => None,
        }
    }
}

/// State carried from one line to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineState {
    stack: Vec<Mode>,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            stack: vec![Mode::Root],
        }
    }
}

impl LineState {
    pub fn mode(&self) -> Mode {
        self.stack.last().copied().unwrap_or(Mode::Root)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn push(&mut self, mode: Mode) {
        self.stack.push(mode);
    }

    pub(crate) fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Drop the modes that do not survive a line break.
    pub(crate) fn begin_line(&mut self) {
        while self.mode().ends_with_line() {
            self.pop();
        }
    }
}

/// One classified span of a line, as byte offsets into that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub class: TokenClass,
    /// Mode in effect after this token.
    pub mode: Mode,
}

impl Token {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Tokens of one line and the state handed to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    pub state: LineState,
}

impl LineTokens {
    pub fn first_significant(&self) -> Option<&Token> {
        self.tokens.iter().find(|t| t.class != TokenClass::White)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_line_drops_operator_and_params() {
        let mut state = LineState::default();
        state.push(Mode::Operator);
        state.begin_line();
        assert_eq!(state.mode(), Mode::Root);

        state.push(Mode::Params);
        state.begin_line();
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn begin_line_keeps_open_literal() {
        let mut state = LineState::default();
        state.push(Mode::DoubleQuoted);
        state.begin_line();
        assert_eq!(state.mode(), Mode::DoubleQuoted);
    }

    #[test]
    fn root_is_never_popped() {
        let mut state = LineState::default();
        state.pop();
        state.pop();
        assert_eq!(state.mode(), Mode::Root);
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn class_names() {
        assert_eq!(TokenClass::StringInvalid.as_str(), "string.invalid");
        assert_eq!(TokenClass::Section.as_str(), "metatag");
        assert!(TokenClass::StringEscape.is_string());
        assert!(!TokenClass::Number.is_string());
    }
}
