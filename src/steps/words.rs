//! Word splitting and placeholder handling for step text.

use crate::vocab::Vocabulary;

/// A quoted or angle-bracketed word, e.g. `"button"` or `<row>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub open: char,
    pub name: &'a str,
    pub close: char,
}

fn closing_for(open: char) -> Option<char> {
    match open {
        '"' => Some('"'),
        '\'' => Some('\''),
        '<' => Some('>'),
        _ => None,
    }
}

/// Split a step line into words.
///
/// A word starting with a quote or `<` runs to its closing delimiter, so a
/// placeholder containing spaces stays one word. Unclosed literals run to
/// the end of the line.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut closing: Option<char> = None;

    for c in text.chars() {
        if let Some(close) = closing {
            current.push(c);
            if c == close {
                closing = None;
            }
            continue;
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if current.is_empty() {
            closing = closing_for(c);
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Parse a whole word as a placeholder.
pub fn placeholder(word: &str) -> Option<Placeholder<'_>> {
    let open = word.chars().next()?;
    let close = closing_for(open)?;
    if word.len() < open.len_utf8() + close.len_utf8() || !word.ends_with(close) {
        return None;
    }
    let name = &word[open.len_utf8()..word.len() - close.len_utf8()];
    // `"a"b"` is two literals glued together, not a placeholder.
    let inner_stop = if open == '<' { '<' } else { close };
    if name.contains(inner_stop) {
        return None;
    }
    Some(Placeholder { open, name, close })
}

pub fn is_placeholder(word: &str) -> bool {
    placeholder(word).is_some()
}

/// Canonical catalog key of a step line.
///
/// The leading keyword phrase and all placeholders are dropped; the
/// remaining literal words are case-folded and joined by single spaces.
pub fn step_key<S: AsRef<str>>(words: &[S], vocabulary: &Vocabulary) -> String {
    let skip = vocabulary.match_keyword(words).unwrap_or(0);
    words[skip..]
        .iter()
        .map(AsRef::as_ref)
        .filter(|w| !is_placeholder(w))
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace a placeholder's inner name with its element/variable value,
/// keeping the original delimiters. Other words are returned unchanged.
pub fn substitute(word: &str, vocabulary: &Vocabulary) -> String {
    match placeholder(word) {
        Some(p) => match vocabulary.substitution(p.name) {
            Some(value) => format!("{}{}{}", p.open, value, p.close),
            None => word.to_string(),
        },
        None => word.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::new().with_keywords(&["given", "when", "and then"])
    }

    // ── split_words ──

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split_words("  Given I   open "), vec!["Given", "I", "open"]);
    }

    #[test]
    fn quoted_words_keep_spaces() {
        assert_eq!(
            split_words(r#"I type "hello world" into <the field>"#),
            vec!["I", "type", "\"hello world\"", "into", "<the field>"]
        );
    }

    #[test]
    fn apostrophe_inside_word_is_not_a_quote() {
        assert_eq!(split_words("I don't go"), vec!["I", "don't", "go"]);
    }

    #[test]
    fn unclosed_quote_runs_to_end() {
        assert_eq!(split_words("I type 'abc def"), vec!["I", "type", "'abc def"]);
    }

    #[test]
    fn empty_text() {
        assert!(split_words("   ").is_empty());
    }

    // ── placeholders ──

    #[test]
    fn recognises_placeholders() {
        assert_eq!(
            placeholder("\"button\""),
            Some(Placeholder {
                open: '"',
                name: "button",
                close: '"'
            })
        );
        assert!(is_placeholder("'x'"));
        assert!(is_placeholder("<row>"));
        assert!(is_placeholder("\"\""));
    }

    #[test]
    fn rejects_non_placeholders() {
        assert!(!is_placeholder("button"));
        assert!(!is_placeholder("\"open"));
        assert!(!is_placeholder("\""));
        assert!(!is_placeholder("\"a\"b\""));
        assert!(!is_placeholder("<a<b>"));
        assert!(!is_placeholder("\"x\","));
    }

    // ── keys ──

    #[test]
    fn key_drops_keyword_and_placeholders() {
        let words = split_words(r#"Given I open "page""#);
        assert_eq!(step_key(&words, &vocab()), "i open");
    }

    #[test]
    fn key_ignores_placeholder_contents() {
        let a = split_words(r#"When I click "Save" on <form>"#);
        let b = split_words(r#"when i click 'Cancel' on "dialog""#);
        assert_eq!(step_key(&a, &vocab()), step_key(&b, &vocab()));
    }

    #[test]
    fn key_without_keyword_keeps_every_literal() {
        let words = split_words("I open it");
        assert_eq!(step_key(&words, &vocab()), "i open it");
    }

    #[test]
    fn key_strips_multi_word_keyword() {
        let words = split_words("And then I leave");
        assert_eq!(step_key(&words, &vocab()), "i leave");
    }

    // ── substitution ──

    #[test]
    fn substitute_keeps_delimiters() {
        let v = vocab().with_elements(vec![("Button".into(), "Save".into())], false);
        assert_eq!(substitute("<button>", &v), "<Save>");
        assert_eq!(substitute("'BUTTON'", &v), "'Save'");
        assert_eq!(substitute("button", &v), "button");
        assert_eq!(substitute("\"other\"", &v), "\"other\"");
    }
}
