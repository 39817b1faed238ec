use crate::ast::*;
use std::fmt::Write;

/// Serializer converts a grid document back to structural text
///
/// Output is canonical: reserved attributes first (`type`, `name`,
/// `component`, `id`, `generated`), then the attribute bag in key order,
/// childless elements self-closed.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(),
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    pub fn serialize(&mut self, doc: &GridDocument) -> String {
        let mut output = String::new();
        self.serialize_node(&doc.root, &mut output);
        output
    }

    fn serialize_node(&mut self, node: &Node, output: &mut String) {
        self.write_indent(output);
        output.push('<');
        output.push_str(node.kind.tag_name());

        match &node.kind {
            NodeKind::MainGrid { name } => write_attribute(output, "name", name),
            NodeKind::Grid { name: Some(name) } => write_attribute(output, "name", name),
            NodeKind::Cell { cell } => {
                write_attribute(output, "type", cell.type_name());
                if let CellKind::Module { component } = cell {
                    write_attribute(output, "component", component);
                }
            }
            _ => {}
        }

        if let Some(id) = &node.id {
            write_attribute(output, "id", id);
        }
        if node.generated {
            write_attribute(output, "generated", "true");
        }
        for (key, value) in &node.attributes {
            write_attribute(output, key, value);
        }

        if node.children.is_empty() {
            output.push_str("/>\n");
            return;
        }

        output.push_str(">\n");
        self.indent_level += 1;
        for child in &node.children {
            self.serialize_node(child, output);
        }
        self.indent_level -= 1;

        self.write_indent(output);
        let _ = writeln!(output, "</{}>", node.kind.tag_name());
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn write_attribute(output: &mut String, key: &str, value: &str) {
    let _ = write!(output, " {}=\"{}\"", key, escape(value));
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Serialize a document with the default two-space indent
pub fn serialize(doc: &GridDocument) -> String {
    Serializer::new().serialize(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_serialize_round_trip() {
        let source = r#"
            <mainGrid name="Dash">
              <content>
                <row size="2">
                  <cell component="Chart" title="Line\nchart &quot;x&quot;"/>
                  <resizer generated="true"/>
                  <cell type="grid">
                    <grid name="side"><content/></grid>
                  </cell>
                </row>
              </content>
            </mainGrid>
        "#;
        let doc = parse(source).unwrap();
        let text = serialize(&doc);
        let reparsed = parse(&text).unwrap();

        assert_eq!(doc.root, reparsed.root);
        assert_eq!(text, serialize(&reparsed));
    }

    #[test]
    fn test_serialize_self_closes_leaves() {
        let doc = parse(r#"<mainGrid name="G" id="g"><content id="c"/></mainGrid>"#).unwrap();
        assert_eq!(
            serialize(&doc),
            "<mainGrid name=\"G\" id=\"g\">\n  <content id=\"c\"/>\n</mainGrid>\n"
        );
    }

    #[test]
    fn test_serialize_custom_indent() {
        let doc = parse(r#"<mainGrid name="G" id="g"><content id="c"/></mainGrid>"#).unwrap();
        let text = Serializer::with_indent("\t").serialize(&doc);
        assert!(text.contains("\n\t<content"));
    }
}
