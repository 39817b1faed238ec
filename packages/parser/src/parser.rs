use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token, TokenSpan};
use std::collections::HashSet;

/// Recursive-descent parser for the structural grid format
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, TokenSpan)>,
    pos: usize,
    seen_ids: HashSet<String>,
}

/// Element header: tag name, attributes and where it starts
struct OpenTag {
    name: String,
    attributes: Vec<(String, String, TokenSpan)>,
    span: TokenSpan,
    self_closing: bool,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            seen_ids: HashSet::new(),
        })
    }

    /// Parse a complete document. Nodes without ids get fresh ones.
    pub fn parse_document(&mut self) -> ParseResult<GridDocument> {
        let root = self.parse_element(None)?;

        if let Some((token, span)) = self.peek() {
            return Err(ParseError::unexpected_token(
                *span,
                "end of input",
                Self::format_token(token),
            ));
        }

        let mut doc = GridDocument::from_root(root)?;
        doc.assign_ids();
        doc.validate()?;
        Ok(doc)
    }

    fn parse_element(&mut self, parent: Option<&NodeKind>) -> ParseResult<Node> {
        let open = self.parse_open_tag()?;
        let mut node = Self::build_node(&open)?;

        if let Some(parent) = parent {
            if !parent.allows_child(&node.kind) {
                return Err(ParseError::InvalidNesting {
                    span: open.span,
                    parent: parent.tag_name().to_string(),
                    child: open.name,
                });
            }
        } else if !matches!(node.kind, NodeKind::MainGrid { .. }) {
            return Err(ParseError::InvalidNesting {
                span: open.span,
                parent: "document".to_string(),
                child: open.name,
            });
        }

        if let Some(id) = &node.id {
            if !self.seen_ids.insert(id.clone()) {
                return Err(ParseError::DuplicateId {
                    span: open.span,
                    id: id.clone(),
                });
            }
        }

        if open.self_closing {
            return Ok(node);
        }

        loop {
            match self.peek() {
                Some((Token::LAngle, _)) => {
                    let child = self.parse_element(Some(&node.kind))?;
                    node.children.push(child);
                }
                Some((Token::OpenClose, _)) => {
                    self.advance();
                    let (close, span) = self.expect_ident()?;
                    if close != open.name {
                        return Err(ParseError::MismatchedClose {
                            span,
                            expected: open.name,
                            found: close,
                        });
                    }
                    self.expect(Token::RAngle, "'>'")?;
                    return Ok(node);
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(
                        *span,
                        format!("child element or </{}>", open.name),
                        Self::format_token(token),
                    ));
                }
                None => {
                    return Err(ParseError::Unterminated {
                        span: open.span,
                        name: open.name,
                    });
                }
            }
        }
    }

    fn parse_open_tag(&mut self) -> ParseResult<OpenTag> {
        let start = self.expect(Token::LAngle, "'<'")?;
        let (name, name_span) = self.expect_ident()?;

        let mut attributes = Vec::new();
        loop {
            match self.peek() {
                Some((Token::Ident(_), _)) => {
                    let (key, key_span) = self.expect_ident()?;
                    self.expect(Token::Eq, "'='")?;
                    let (value, value_span) = self.expect_string()?;
                    let span = key_span.join(value_span);
                    if attributes.iter().any(|(k, _, _): &(String, String, TokenSpan)| *k == key) {
                        return Err(ParseError::invalid_attribute(
                            span,
                            format!("attribute `{}` given twice", key),
                        ));
                    }
                    attributes.push((key, value, span));
                }
                Some((Token::SelfClose, span)) => {
                    let span = start.join(*span);
                    self.advance();
                    return Ok(OpenTag {
                        name,
                        attributes,
                        span,
                        self_closing: true,
                    });
                }
                Some((Token::RAngle, span)) => {
                    let span = start.join(*span);
                    self.advance();
                    return Ok(OpenTag {
                        name,
                        attributes,
                        span,
                        self_closing: false,
                    });
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(
                        *span,
                        "attribute, '>' or '/>'",
                        Self::format_token(token),
                    ));
                }
                None => {
                    return Err(ParseError::Unterminated {
                        span: start.join(name_span),
                        name,
                    });
                }
            }
        }
    }

    /// Turn a tag into a node, lifting reserved attributes into typed fields
    fn build_node(open: &OpenTag) -> ParseResult<Node> {
        let mut attributes = Attributes::new();
        let mut id = None;
        let mut name = None;
        let mut kind_attr = None;
        let mut component = None;
        let mut generated = false;

        for (key, value, span) in &open.attributes {
            match key.as_str() {
                "id" => {
                    if value.is_empty() {
                        return Err(ParseError::invalid_attribute(*span, "id must not be empty"));
                    }
                    id = Some(value.clone());
                }
                "name" if Self::is_grid_tag(&open.name) => name = Some(value.clone()),
                "type" if open.name == "cell" || Self::is_grid_tag(&open.name) => {
                    kind_attr = Some((value.clone(), *span))
                }
                "component" if open.name == "cell" => component = Some(value.clone()),
                "generated" => {
                    generated = match value.as_str() {
                        "true" => true,
                        "false" => false,
                        _ => {
                            return Err(ParseError::invalid_attribute(
                                *span,
                                "generated must be \"true\" or \"false\"",
                            ))
                        }
                    }
                }
                _ => {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }

        let kind = match open.name.as_str() {
            "mainGrid" => NodeKind::MainGrid {
                name: Self::require_name(name, open)?,
            },
            "grid" => match kind_attr {
                Some((t, _)) if t == "mainGrid" => NodeKind::MainGrid {
                    name: Self::require_name(name, open)?,
                },
                Some((t, span)) if t != "grid" => {
                    return Err(ParseError::invalid_attribute(
                        span,
                        format!("unknown grid type `{}`", t),
                    ))
                }
                _ => NodeKind::Grid { name },
            },
            "row" => NodeKind::Row,
            "resizer" => NodeKind::Resizer,
            "content" => NodeKind::Content,
            "placeholder" => NodeKind::Placeholder,
            "cell" => {
                let cell = match (kind_attr, component) {
                    (Some((t, _)), Some(component)) if t == "module" => CellKind::Module { component },
                    (None, Some(component)) => CellKind::Module { component },
                    (Some((t, span)), None) if t == "module" => {
                        return Err(ParseError::invalid_attribute(
                            span,
                            "module cell requires a `component` attribute",
                        ))
                    }
                    (Some((t, _)), None) if t == "grid" => CellKind::Grid,
                    (Some((t, _)), None) if t == "placeholder" => CellKind::Placeholder,
                    (Some((t, span)), Some(_)) if t == "grid" || t == "placeholder" => {
                        return Err(ParseError::invalid_attribute(
                            span,
                            format!("`component` is only valid on module cells, not on a {} cell", t),
                        ))
                    }
                    (Some((t, span)), _) => {
                        return Err(ParseError::invalid_attribute(
                            span,
                            format!("unknown cell type `{}`", t),
                        ))
                    }
                    (None, None) => {
                        return Err(ParseError::invalid_attribute(
                            open.span,
                            "cell requires a `type` attribute",
                        ))
                    }
                };
                NodeKind::Cell { cell }
            }
            other => {
                return Err(ParseError::UnknownElement {
                    span: open.span,
                    name: other.to_string(),
                })
            }
        };

        Ok(Node {
            kind,
            id,
            attributes,
            children: Vec::new(),
            generated,
        })
    }

    fn is_grid_tag(name: &str) -> bool {
        name == "grid" || name == "mainGrid"
    }

    fn require_name(name: Option<String>, open: &OpenTag) -> ParseResult<String> {
        match name {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(ParseError::invalid_attribute(
                open.span,
                "mainGrid requires a non-empty `name`",
            )),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, TokenSpan)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn check(&self, token: &Token) -> bool {
        match self.peek() {
            Some((t, _)) => std::mem::discriminant(t) == std::mem::discriminant(token),
            None => false,
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> ParseResult<TokenSpan> {
        if self.check(&token) {
            let span = self.peek().map(|(_, s)| *s).unwrap_or(TokenSpan::new(0, 0));
            self.advance();
            Ok(span)
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(String, TokenSpan)> {
        match self.peek() {
            Some((Token::Ident(s), span)) => {
                let val = (s.to_string(), *span);
                self.advance();
                Ok(val)
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn expect_string(&mut self) -> ParseResult<(String, TokenSpan)> {
        match self.peek() {
            Some((Token::String(s), span)) | Some((Token::SingleQuoteString(s), span)) => {
                let val = (unescape(s), *span);
                self.advance();
                Ok(val)
            }
            _ => Err(self.error_here("quoted string")),
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some((token, span)) => ParseError::unexpected_token(*span, expected, Self::format_token(token)),
            None => ParseError::unexpected_eof(expected),
        }
    }

    /// Format a token for display in error messages
    fn format_token(token: &Token) -> String {
        match token {
            Token::Comment => "comment".to_string(),
            Token::OpenClose => "'</'".to_string(),
            Token::LAngle => "'<'".to_string(),
            Token::SelfClose => "'/>'".to_string(),
            Token::RAngle => "'>'".to_string(),
            Token::Eq => "'='".to_string(),
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::String(s) | Token::SingleQuoteString(s) => format!("string \"{}\"", s),
        }
    }
}

/// Resolve backslash escapes inside a quoted value
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parse structural text into a grid document
pub fn parse(source: &str) -> ParseResult<GridDocument> {
    Parser::new(source)?.parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"
        <mainGrid name="Test">
            <content>
                <row>
                    <cell type="module" component="Test1" text="a"/>
                    <resizer/>
                    <cell component="Test2" text='b "quoted"'/>
                </row>
            </content>
        </mainGrid>
    "#;

    #[test]
    fn test_parse_simple_document() {
        let doc = parse(SIMPLE).unwrap();
        assert_eq!(doc.name, "Test");

        let rows: Vec<_> = doc.root.rows().collect();
        assert_eq!(rows.len(), 1);

        let modules: Vec<_> = doc.module_cells().collect();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].component(), Some("Test1"));
        assert_eq!(modules[0].attribute("text"), Some("a"));
        assert_eq!(modules[1].attribute("text"), Some("b \"quoted\""));
        assert_eq!(doc.all_ids().len(), 6);
    }

    #[test]
    fn test_grid_type_main_grid_is_root() {
        let doc = parse(r#"<grid type="mainGrid" name="G"><content/></grid>"#).unwrap();
        assert!(matches!(doc.root.kind, NodeKind::MainGrid { .. }));
    }

    #[test]
    fn test_explicit_ids_are_kept() {
        let doc = parse(r#"<mainGrid name="G" id="root"><content id="c"/></mainGrid>"#).unwrap();
        assert_eq!(doc.root.id(), Some("root"));
        assert!(doc.find_node("c").is_some());
    }

    #[test]
    fn test_rejects_unknown_element() {
        let err = parse(r#"<mainGrid name="G"><content><table/></content></mainGrid>"#).unwrap_err();
        assert!(matches!(err, ParseError::UnknownElement { ref name, .. } if name == "table"));
    }

    #[test]
    fn test_rejects_invalid_nesting() {
        let err = parse(r#"<mainGrid name="G"><content><cell component="X"/></content></mainGrid>"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidNesting { ref parent, .. } if parent == "content"));

        let err = parse(r#"<mainGrid name="G"><row/></mainGrid>"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNesting { .. }));
    }

    #[test]
    fn test_rejects_unterminated_element() {
        let err = parse(r#"<mainGrid name="G"><content><row>"#).unwrap_err();
        assert!(matches!(err, ParseError::Unterminated { ref name, .. } if name == "row"));
    }

    #[test]
    fn test_rejects_mismatched_close() {
        let err = parse(r#"<mainGrid name="G"><content></row></mainGrid>"#).unwrap_err();
        assert!(matches!(err, ParseError::MismatchedClose { .. }));
    }

    #[test]
    fn test_rejects_component_on_non_module_cell() {
        let err = parse(
            r#"<mainGrid name="G"><content><row><cell type="grid" component="X"/></row></content></mainGrid>"#,
        )
        .unwrap_err();
        match err {
            ParseError::InvalidAttribute { ref message, .. } => {
                assert!(message.contains("only valid on module cells"), "{}", message)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = parse(
            r#"<mainGrid name="G"><content><row id="x"/><resizer/><row id="x"/></content></mainGrid>"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::DuplicateId { ref id, .. } if id == "x"));
    }

    #[test]
    fn test_rejects_non_main_grid_root() {
        let err = parse("<row/>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNesting { .. }));
    }

    #[test]
    fn test_rejects_missing_content() {
        let err = parse(r#"<mainGrid name="G"/>"#).unwrap_err();
        assert!(matches!(err, ParseError::Structure(_)));
    }

    #[test]
    fn test_rejects_trailing_input() {
        let err = parse(r#"<mainGrid name="G"><content/></mainGrid><row/>"#).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_nested_grid_cell() {
        let doc = parse(
            r#"
            <mainGrid name="G">
                <content>
                    <row>
                        <cell type="grid">
                            <grid name="inner"><content><row><cell component="M"/></row></content></grid>
                        </cell>
                    </row>
                </content>
            </mainGrid>"#,
        )
        .unwrap();
        assert!(doc.root.contains_sub_grid());
        assert!(doc.find_grid("inner").is_some());
    }
}
