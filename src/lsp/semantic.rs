//! Semantic token encoding for the LSP server.

use tower_lsp::lsp_types::{
    SemanticToken, SemanticTokenModifier, SemanticTokenType, SemanticTokensLegend,
};

use crate::grammar::{LineTokens, TokenClass};

const INVALID_MODIFIER: u32 = 1;

fn token_types() -> Vec<SemanticTokenType> {
    vec![
        SemanticTokenType::NAMESPACE,
        SemanticTokenType::KEYWORD,
        SemanticTokenType::VARIABLE,
        SemanticTokenType::DECORATOR,
        SemanticTokenType::OPERATOR,
        SemanticTokenType::COMMENT,
        SemanticTokenType::NUMBER,
        SemanticTokenType::STRING,
        SemanticTokenType::REGEXP,
        SemanticTokenType::new("emphasis"),
        SemanticTokenType::new("strong"),
    ]
}

pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: token_types(),
        token_modifiers: vec![SemanticTokenModifier::new("invalid")],
    }
}

/// Index into [`legend`] types plus modifier bits; `None` for plain text.
fn classify(class: TokenClass) -> Option<(u32, u32)> {
    Some(match class {
        TokenClass::Section => (0, 0),
        TokenClass::Keyword => (1, 0),
        TokenClass::Identifier => (2, 0),
        TokenClass::Annotation => (3, 0),
        TokenClass::Operator => (4, 0),
        TokenClass::Comment => (5, 0),
        TokenClass::Number => (6, 0),
        TokenClass::String => (7, 0),
        TokenClass::StringInvalid => (7, INVALID_MODIFIER),
        TokenClass::StringEscape => (8, 0),
        TokenClass::StringEscapeInvalid => (8, INVALID_MODIFIER),
        TokenClass::Emphasis => (9, 0),
        TokenClass::Strong => (10, 0),
        TokenClass::White | TokenClass::Text => return None,
    })
}

/// UTF-16 length of `s`, the unit LSP positions count in.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Byte offset in `line` of a UTF-16 `character` position, clamped.
pub fn byte_offset(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (offset, ch) in line.char_indices() {
        if units >= character {
            return offset;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}

/// Delta-encode token spans for `textDocument/semanticTokens/full`.
pub fn encode(text: &str, lines: &[LineTokens]) -> Vec<SemanticToken> {
    let mut data = Vec::new();
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;
    for (index, (line, tokens)) in text.lines().zip(lines).enumerate() {
        let index = index as u32;
        for token in &tokens.tokens {
            let Some((token_type, modifiers)) = classify(token.class) else {
                continue;
            };
            let start = utf16_len(&line[..token.start]);
            let length = utf16_len(token.text(line));
            let delta_line = index - prev_line;
            let delta_start = if delta_line == 0 { start - prev_start } else { start };
            data.push(SemanticToken {
                delta_line,
                delta_start,
                length,
                token_type,
                token_modifiers_bitset: modifiers,
            });
            prev_line = index;
            prev_start = start;
        }
    }
    data
}
