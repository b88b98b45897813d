//! Line tokenizer for step scripts.
//!
//! Each line is scanned by a small mode-stack machine. At the start of a line
//! the root rules try, in order: a `Heading:` label, a leading keyword phrase,
//! then the generic content rules (annotations, emphasis lines, table rows,
//! comments, numbers, literals). Whatever is left over is emphasized text.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::token::{LineState, LineTokens, Mode, Token, TokenClass};
use crate::vocab::Vocabulary;

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\p{Alphabetic}+)\s*:").expect("invalid section pattern"))
}

fn leading_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\p{Alphabetic}+").expect("invalid word pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t\r\n]+").expect("invalid whitespace pattern"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+]?(\d*\.)?\d+([eE][+-]?\d+)?[jJ]?[lL]?").expect("invalid number pattern")
    })
}

/// A literal that runs to the end of the line without its closing delimiter.
fn unterminated_re(open: char) -> &'static Regex {
    static DOUBLE: OnceLock<Regex> = OnceLock::new();
    static SINGLE: OnceLock<Regex> = OnceLock::new();
    static ANGLE: OnceLock<Regex> = OnceLock::new();
    match open {
        '"' => DOUBLE.get_or_init(|| Regex::new(r#"^"([^"\\]|\\.)*$"#).expect("invalid pattern")),
        '\'' => SINGLE.get_or_init(|| Regex::new(r"^'([^'\\]|\\.)*$").expect("invalid pattern")),
        _ => ANGLE.get_or_init(|| Regex::new(r"^<([^>\\]|\\.)*$").expect("invalid pattern")),
    }
}

fn escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\\(?:[abfnrtv\\"'>]|x[0-9A-Fa-f]{1,4}|u[0-9A-Fa-f]{4}|U[0-9A-Fa-f]{8})"#)
            .expect("invalid escape pattern")
    })
}

/// Tokenizer bound to one vocabulary snapshot.
///
/// Rebuild the grammar when the vocabulary changes; a grammar never sees a
/// table mid-update.
#[derive(Debug, Clone)]
pub struct Grammar {
    vocabulary: Arc<Vocabulary>,
    longest_phrase: usize,
}

/// Result of a single rule: how many bytes it claims and as what.
struct Step {
    len: usize,
    class: TokenClass,
    action: Action,
}

enum Action {
    Stay,
    Push(Mode),
    Pop,
}

impl Step {
    fn new(len: usize, class: TokenClass) -> Self {
        Self {
            len,
            class,
            action: Action::Stay,
        }
    }

    fn then(mut self, action: Action) -> Self {
        self.action = action;
        self
    }
}

impl Grammar {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        let longest_phrase = vocabulary.keywords().first().map_or(0, Vec::len);
        Self {
            vocabulary,
            longest_phrase,
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Tokenize a whole document, threading state between lines.
    pub fn tokenize(&self, text: &str) -> Vec<LineTokens> {
        let mut state = LineState::default();
        let mut lines = Vec::new();
        for line in text.lines() {
            let tokens = self.tokenize_line(line, &state);
            state = tokens.state.clone();
            lines.push(tokens);
        }
        lines
    }

    pub fn tokenize_line(&self, line: &str, state: &LineState) -> LineTokens {
        let mut state = state.clone();
        state.begin_line();
        let mut tokens: Vec<Token> = Vec::new();
        let mut pos = 0;

        while pos < line.len() {
            let step = match state.mode() {
                Mode::Root => self.root(line, pos),
                Mode::Operator => self.operator(line, pos),
                Mode::Params => common(line, pos).unwrap_or_else(|| text_char(line, pos)),
                mode => literal(line, pos, mode),
            };
            debug_assert!(step.len > 0, "tokenizer rule made no progress");
            match step.action {
                Action::Stay => {}
                Action::Push(mode) => state.push(mode),
                Action::Pop => state.pop(),
            }
            let end = pos + step.len;
            match tokens.last_mut() {
                Some(last) if last.class == TokenClass::Text && step.class == TokenClass::Text => {
                    last.end = end;
                }
                _ => tokens.push(Token {
                    start: pos,
                    end,
                    class: step.class,
                    mode: state.mode(),
                }),
            }
            pos = end;
        }

        LineTokens { tokens, state }
    }

    /// Byte length and word count of a keyword phrase at the start of `line`.
    pub fn leading_keyword(&self, line: &str) -> Option<(usize, usize)> {
        let words = leading_words(line, self.longest_phrase);
        let texts: Vec<&str> = words.iter().map(|&(s, e)| &line[s..e]).collect();
        let count = self.vocabulary.match_keyword(&texts)?;
        Some((words[count - 1].1, count))
    }

    fn root(&self, line: &str, pos: usize) -> Step {
        if pos == 0 {
            if let Some(caps) = section_re().captures(line) {
                let len = caps.get(0).map_or(0, |m| m.end());
                let word = caps.get(1).map_or("", |m| m.as_str());
                let class = if self.vocabulary.is_single_keyword(word) {
                    TokenClass::Section
                } else {
                    TokenClass::Identifier
                };
                return Step::new(len, class);
            }
            if let Some((len, _)) = self.leading_keyword(line) {
                return Step::new(len, TokenClass::Keyword).then(Action::Push(Mode::Operator));
            }
            if let Some(m) = leading_word_re().find(line) {
                return Step::new(m.end(), TokenClass::Emphasis);
            }
        }
        common(line, pos).unwrap_or_else(|| Step::new(line.len() - pos, TokenClass::Emphasis))
    }

    fn operator(&self, line: &str, pos: usize) -> Step {
        if let Some(m) = leading_word_re().find(&line[pos..]) {
            return Step::new(m.end(), TokenClass::Identifier);
        }
        common(line, pos).unwrap_or_else(|| text_char(line, pos))
    }
}

/// Rules shared by the root, operator and parameter modes.
fn common(line: &str, pos: usize) -> Option<Step> {
    let rest = &line[pos..];
    let at_line_start = pos == 0;
    let trimmed = rest.trim_start();

    if rest.starts_with('@') {
        return Some(Step::new(rest.len(), TokenClass::Annotation));
    }
    if at_line_start && trimmed.starts_with('*') {
        return Some(Step::new(rest.len(), TokenClass::Strong));
    }
    if at_line_start && trimmed.starts_with('|') {
        let len = rest.len() - trimmed.len() + 1;
        return Some(Step::new(len, TokenClass::Operator).then(Action::Push(Mode::Params)));
    }
    if let Some(m) = whitespace_re().find(rest) {
        return Some(Step::new(m.end(), TokenClass::White));
    }
    if at_line_start && (rest.starts_with('#') || rest.starts_with("//")) {
        return Some(Step::new(rest.len(), TokenClass::Comment));
    }
    if let Some(m) = number_re().find(rest) {
        return Some(Step::new(m.end(), TokenClass::Number));
    }
    for (open, mode) in [
        ('"', Mode::DoubleQuoted),
        ('\'', Mode::SingleQuoted),
        ('<', Mode::Angled),
    ] {
        if !rest.starts_with(open) {
            continue;
        }
        if unterminated_re(open).is_match(rest) {
            return Some(Step::new(rest.len(), TokenClass::StringInvalid));
        }
        return Some(Step::new(1, TokenClass::String).then(Action::Push(mode)));
    }
    None
}

/// Rules inside a delimited literal.
fn literal(line: &str, pos: usize, mode: Mode) -> Step {
    let rest = &line[pos..];
    let close = mode.closing_delimiter().unwrap_or('"');

    if rest.starts_with(close) {
        return Step::new(close.len_utf8(), TokenClass::String).then(Action::Pop);
    }
    if rest.starts_with('\\') {
        if let Some(m) = escape_re().find(rest) {
            return Step::new(m.end(), TokenClass::StringEscape);
        }
        let len = rest.chars().take(2).map(char::len_utf8).sum();
        return Step::new(len, TokenClass::StringEscapeInvalid);
    }
    let len = rest
        .char_indices()
        .find(|&(_, c)| c == close || c == '\\')
        .map_or(rest.len(), |(i, _)| i);
    Step::new(len, TokenClass::String)
}

fn text_char(line: &str, pos: usize) -> Step {
    let len = line[pos..].chars().next().map_or(1, char::len_utf8);
    Step::new(len, TokenClass::Text)
}

/// Byte ranges of up to `limit` whitespace-separated words at the line start.
fn leading_words(line: &str, limit: usize) -> Vec<(usize, usize)> {
    let mut words = Vec::new();
    let mut pos = 0;
    while words.len() < limit {
        let rest = &line[pos..];
        let trimmed = rest.trim_start();
        if !words.is_empty() && trimmed.len() == rest.len() {
            break;
        }
        let start = pos + (rest.len() - trimmed.len());
        let len: usize = trimmed
            .chars()
            .take_while(|c| c.is_alphabetic())
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            break;
        }
        words.push((start, start + len));
        pos = start + len;
    }
    words
}
