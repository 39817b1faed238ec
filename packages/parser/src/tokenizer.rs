//! Tokenizer for the structural grid format using logos

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    #[token("<!--", lex_comment)]
    Comment,

    #[token("</")]
    OpenClose,

    #[token("<")]
    LAngle,

    #[token("/>")]
    SelfClose,

    #[token(">")]
    RAngle,

    #[token("=")]
    Eq,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-.:]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    String(&'src str),

    #[regex(r"'([^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    SingleQuoteString(&'src str),
}

/// Consume a comment body up to and including `-->`
fn lex_comment<'src>(lex: &mut logos::Lexer<'src, Token<'src>>) -> bool {
    match lex.remainder().find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            true
        }
        None => false,
    }
}

/// Byte range of a token in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`
    pub fn join(self, other: TokenSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for TokenSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for TokenSpan {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Lex source into tokens with spans; comments are dropped
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, TokenSpan)>> {
    let mut tokens = Vec::new();
    for (result, range) in Token::lexer(source).spanned() {
        match result {
            Ok(Token::Comment) => {}
            Ok(token) => tokens.push((token, TokenSpan::from(range))),
            Err(_) => {
                let message = if source[range.start..].starts_with("<!--") {
                    "unterminated comment"
                } else {
                    "unexpected character"
                };
                return Err(ParseError::LexError {
                    span: TokenSpan::from(range),
                    message: message.to_string(),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_element() {
        let tokens = tokenize(r#"<cell type="module" component='Test1'/>"#).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::LAngle,
                Token::Ident("cell"),
                Token::Ident("type"),
                Token::Eq,
                Token::String("module"),
                Token::Ident("component"),
                Token::Eq,
                Token::SingleQuoteString("Test1"),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_tokenize_skips_comments() {
        let tokens = tokenize("<!-- a <row> in a comment --><row></row>").unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].0, Token::LAngle);
        assert_eq!(tokens[3].0, Token::OpenClose);
    }

    #[test]
    fn test_tokenize_rejects_stray_characters() {
        let err = tokenize("<row> & </row>").unwrap_err();
        assert!(matches!(err, ParseError::LexError { .. }));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("<row><!-- never closed").unwrap_err();
        match err {
            ParseError::LexError { message, .. } => assert_eq!(message, "unterminated comment"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
