//! Read-only views over the grid tree
//!
//! `NodeView` carries the query helpers shared by every node kind;
//! `GridView` composes a `NodeView` and adds grid-level queries.
//! Presentation types embed these instead of re-implementing lookups.

use crate::ast::{Attributes, GridDocument, Node, NodeKind};

#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    node: &'a Node,
}

impl<'a> NodeView<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn id(&self) -> Option<&'a str> {
        self.node.id()
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node.kind
    }

    pub fn attributes(&self) -> &'a Attributes {
        &self.node.attributes
    }

    pub fn relative_size(&self) -> f64 {
        self.node.relative_size()
    }

    /// Share of the space taken among its sizable siblings
    pub fn fraction_of(&self, siblings: &[Node]) -> f64 {
        let total: f64 = siblings
            .iter()
            .filter(|n| is_sizable(n))
            .map(Node::relative_size)
            .sum();
        if total > 0.0 {
            self.relative_size() / total
        } else {
            0.0
        }
    }

    pub fn is_generated(&self) -> bool {
        self.node.generated
    }

    pub fn structural_children(&self) -> impl Iterator<Item = NodeView<'a>> {
        self.node.structural_children().iter().map(NodeView::new)
    }

    pub fn contains_sub_grid(&self) -> bool {
        self.node.contains_sub_grid()
    }
}

/// Rows and non-placeholder cells take part in proportional sizing
pub fn is_sizable(node: &Node) -> bool {
    node.is_row() || (node.is_cell() && !node.is_placeholder_cell())
}

#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    pub node: NodeView<'a>,
}

impl<'a> GridView<'a> {
    /// View a grid node; `None` for anything else
    pub fn new(node: &'a Node) -> Option<Self> {
        if node.is_grid() {
            Some(Self {
                node: NodeView::new(node),
            })
        } else {
            None
        }
    }

    pub fn of_document(doc: &'a GridDocument) -> Self {
        Self {
            node: NodeView::new(&doc.root),
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        self.node.node().grid_name()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Node> {
        self.node.node().rows()
    }

    /// Module cells of this grid and its nested grids, in document order
    pub fn module_cells(&self) -> impl Iterator<Item = &'a Node> {
        self.node.node().module_cells()
    }

    pub fn has_placeholders(&self) -> bool {
        self.node.node().descendants().any(Node::is_placeholder_cell)
    }

    pub fn has_resizers(&self) -> bool {
        self.node.node().descendants().any(Node::is_resizer)
    }

    /// Module ids of each row of this grid; nested grids contribute
    /// their modules to the row holding them
    pub fn module_matrix(&self) -> Vec<Vec<&'a str>> {
        self.rows()
            .map(|row| {
                row.cells()
                    .flat_map(|cell| cell.module_cells().filter_map(Node::id))
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect()
    }

    /// Relative sizes of the grid's rows (resizers and generated rows skipped)
    pub fn row_fractions(&self) -> Vec<f64> {
        let siblings = self.node.node().structural_children();
        self.rows()
            .filter(|r| !r.generated)
            .map(|r| NodeView::new(r).fraction_of(siblings))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_grid_view_queries() {
        let doc = parse(
            r#"
            <mainGrid name="G">
              <content>
                <row size="3">
                  <cell component="A" id="a"/>
                  <cell type="placeholder"/>
                  <cell component="B" id="b"/>
                </row>
                <resizer/>
                <row>
                  <cell type="grid">
                    <grid name="inner"><content><row><cell component="C" id="c"/></row></content></grid>
                  </cell>
                </row>
              </content>
            </mainGrid>"#,
        )
        .unwrap();

        let view = GridView::of_document(&doc);
        assert_eq!(view.name(), Some("G"));
        assert!(view.has_placeholders());
        assert!(view.has_resizers());
        assert_eq!(view.module_matrix(), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(view.row_fractions(), vec![0.75, 0.25]);
        assert!(view.node.contains_sub_grid());
    }

    #[test]
    fn test_grid_view_rejects_non_grid() {
        let row = Node::row();
        assert!(GridView::new(&row).is_none());
    }
}
