use crate::tokenizer::TokenSpan;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Structural invariant violated by a document tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("document root must be a mainGrid, found <{0}>")]
    RootNotMainGrid(String),

    #[error("mainGrid may only appear as the document root")]
    NestedMainGrid,

    #[error("<{child}> is not allowed inside <{parent}>")]
    InvalidNesting { parent: String, child: String },

    #[error("{kind} must have {expected}, found {found} children")]
    ChildCount {
        kind: String,
        expected: String,
        found: usize,
    },

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("duplicate grid name: {0}")]
    DuplicateGridName(String),

    #[error("resizer {0:?} must sit between two siblings")]
    DanglingResizer(String),
}

/// Malformed structural text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: TokenSpan,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Unknown element <{name}> at {span}")]
    UnknownElement { span: TokenSpan, name: String },

    #[error("Element <{child}> at {span} is not allowed inside <{parent}>")]
    InvalidNesting {
        span: TokenSpan,
        parent: String,
        child: String,
    },

    #[error("Element <{name}> opened at {span} is never closed")]
    Unterminated { span: TokenSpan, name: String },

    #[error("Closing tag </{found}> at {span} does not match <{expected}>")]
    MismatchedClose {
        span: TokenSpan,
        expected: String,
        found: String,
    },

    #[error("Duplicate id {id:?} at {span}")]
    DuplicateId { span: TokenSpan, id: String },

    #[error("Invalid attribute at {span}: {message}")]
    InvalidAttribute { span: TokenSpan, message: String },

    #[error("Lexer error at {span}: {message}")]
    LexError { span: TokenSpan, message: String },

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

impl ParseError {
    pub fn unexpected_token(span: TokenSpan, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn invalid_attribute(span: TokenSpan, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<TokenSpan> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnknownElement { span, .. }
            | ParseError::InvalidNesting { span, .. }
            | ParseError::Unterminated { span, .. }
            | ParseError::MismatchedClose { span, .. }
            | ParseError::DuplicateId { span, .. }
            | ParseError::InvalidAttribute { span, .. }
            | ParseError::LexError { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } | ParseError::Structure(_) => None,
        }
    }

    /// Short label for the offending location
    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. } | ParseError::UnexpectedEof { expected } => {
                format!("expected {}", expected)
            }
            ParseError::UnknownElement { name, .. } => format!("unknown element `{}`", name),
            ParseError::InvalidNesting { parent, .. } => format!("not allowed in <{}>", parent),
            ParseError::Unterminated { .. } => "opened here".to_string(),
            ParseError::MismatchedClose { expected, .. } => format!("expected </{}>", expected),
            ParseError::DuplicateId { .. } => "id already used".to_string(),
            ParseError::InvalidAttribute { message, .. } | ParseError::LexError { message, .. } => {
                message.clone()
            }
            ParseError::Structure(e) => e.to_string(),
        }
    }
}

/// Pretty-print a parse error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(TokenSpan {
        start: source.len().saturating_sub(1),
        end: source.len(),
    });

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8(output).unwrap_or_else(|_| error.to_string()),
        Err(_) => error.to_string(),
    }
}

#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, filename: &str, error: &ParseError) -> String {
    format!("{}: {} ({})", filename, error, error.label())
}
