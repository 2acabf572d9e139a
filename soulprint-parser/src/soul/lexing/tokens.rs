//! Value tokens
//!
//!     Scalar values (metadata, section fields, list-item fields) reserve four characters:
//!     colon, backslash, double quote and pipe. Each must be written with a leading backslash.
//!     The logos lexer below splits a raw value into escapes, reserved characters and plain
//!     text runs; [`unescape`] accepts only text and valid escapes.
//!
//!     Multiline block bodies never go through this lexer, they are kept raw.

use logos::Logos;
use thiserror::Error;

/// Characters that must be backslash-escaped inside scalar values
pub const RESERVED: [char; 4] = [':', '\\', '"', '|'];

/// Tokens of a raw scalar value
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ValueToken {
    /// `\:` `\\` `\"` `\|`
    #[regex(r#"\\[:\\"|]"#)]
    Escape,

    /// A backslash not followed by a reserved character
    #[token("\\")]
    Backslash,

    #[token(":")]
    Colon,

    #[token("\"")]
    Quote,

    #[token("|")]
    Pipe,

    // Everything else
    #[regex(r#"[^:\\"|]+"#)]
    Text,
}

impl ValueToken {
    /// Reserved characters that appear without an escape
    pub fn is_unescaped_special(&self) -> bool {
        matches!(self, ValueToken::Colon | ValueToken::Quote | ValueToken::Pipe)
    }
}

/// Why a raw value could not be unescaped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("unescaped '{ch}' at column {column}; write it as '\\{ch}'")]
    UnescapedSpecial { ch: char, column: usize },

    #[error("invalid escape sequence at column {column}")]
    InvalidEscape { column: usize },
}

/// Resolve escapes in a raw scalar value.
///
/// Columns in errors are 1-based character offsets within the value.
pub fn unescape(raw: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(raw.len());
    let mut lexer = ValueToken::lexer(raw);

    while let Some(token) = lexer.next() {
        let slice = lexer.slice();
        let column = raw[..lexer.span().start].chars().count() + 1;
        match token {
            Ok(ValueToken::Text) => out.push_str(slice),
            Ok(ValueToken::Escape) => out.push_str(&slice[1..]),
            Ok(ValueToken::Colon) | Ok(ValueToken::Quote) | Ok(ValueToken::Pipe) => {
                let ch = slice.chars().next().unwrap_or(':');
                return Err(EscapeError::UnescapedSpecial { ch, column });
            }
            Ok(ValueToken::Backslash) | Err(()) => {
                return Err(EscapeError::InvalidEscape { column });
            }
        }
    }

    Ok(out)
}

/// Escape every reserved character so the value survives a round trip through [`unescape`].
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(raw: &str) -> Vec<ValueToken> {
        ValueToken::lexer(raw).filter_map(Result::ok).collect()
    }

    #[test]
    fn test_tokenizes_escapes_and_specials() {
        assert_eq!(
            tokens(r"09\:00 | x"),
            vec![
                ValueToken::Text,
                ValueToken::Escape,
                ValueToken::Text,
                ValueToken::Pipe,
                ValueToken::Text
            ]
        );
        assert_eq!(tokens(r"\n"), vec![ValueToken::Backslash, ValueToken::Text]);
    }

    #[test]
    fn test_unescape_resolves_sequences() {
        assert_eq!(
            unescape(r"2024-01-01T09\:00\:00Z").unwrap(),
            "2024-01-01T09:00:00Z"
        );
        assert_eq!(unescape(r#"say \"hi\" \| \\"#).unwrap(), r#"say "hi" | \"#);
        assert_eq!(unescape("").unwrap(), "");
    }

    #[test]
    fn test_unescaped_special_is_rejected() {
        assert_eq!(
            unescape("a:b"),
            Err(EscapeError::UnescapedSpecial { ch: ':', column: 2 })
        );
        assert_eq!(
            unescape("say \"hi"),
            Err(EscapeError::UnescapedSpecial { ch: '"', column: 5 })
        );
    }

    #[test]
    fn test_invalid_escape_is_rejected() {
        assert_eq!(unescape(r"a\n"), Err(EscapeError::InvalidEscape { column: 2 }));
        assert_eq!(unescape("trailing\\"), Err(EscapeError::InvalidEscape { column: 9 }));
    }

    #[test]
    fn test_escape_output() {
        assert_eq!(escape("09:00"), r"09\:00");
        assert_eq!(escape("plain text"), "plain text");
    }

    proptest! {
        #[test]
        fn escape_then_unescape_is_identity(value in "[ -~é漢]{0,40}") {
            prop_assert_eq!(unescape(&escape(&value)).unwrap(), value);
        }

        #[test]
        fn escaped_values_never_contain_bare_specials(value in "[:|\"a-z]{0,20}") {
            let escaped = escape(&value);
            prop_assert!(!tokens(&escaped).iter().any(ValueToken::is_unescaped_special));
        }
    }
}
