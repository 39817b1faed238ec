use crate::error::StructureError;
use crate::id_generator::IdGenerator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Attribute bag carried by every node (ordered for deterministic output)
pub type Attributes = BTreeMap<String, String>;

/// Attribute holding a node's proportional weight among its siblings
pub const SIZE_ATTRIBUTE: &str = "size";

/// What a cell holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "cellType", rename_all = "camelCase")]
pub enum CellKind {
    /// Opaque module rendered by the presentation layer
    Module { component: String },
    /// Nested grid (exactly one `grid` child)
    Grid,
    /// Empty slot a module can be dropped into
    Placeholder,
}

impl CellKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            CellKind::Module { .. } => "module",
            CellKind::Grid => "grid",
            CellKind::Placeholder => "placeholder",
        }
    }
}

/// Node kinds of the grid tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    /// Document root
    MainGrid { name: String },
    /// Nested grid, optionally addressable by name
    Grid { name: Option<String> },
    Row,
    Cell { cell: CellKind },
    Resizer,
    /// Drop surface inside a placeholder cell
    Placeholder,
    /// Container holding a grid's rows
    Content,
}

impl NodeKind {
    /// Element name used in the structural text format
    pub fn tag_name(&self) -> &'static str {
        match self {
            NodeKind::MainGrid { .. } => "mainGrid",
            NodeKind::Grid { .. } => "grid",
            NodeKind::Row => "row",
            NodeKind::Cell { .. } => "cell",
            NodeKind::Resizer => "resizer",
            NodeKind::Placeholder => "placeholder",
            NodeKind::Content => "content",
        }
    }

    /// Nesting rules between a parent and a direct child
    pub fn allows_child(&self, child: &NodeKind) -> bool {
        match (self, child) {
            (NodeKind::MainGrid { .. } | NodeKind::Grid { .. }, NodeKind::Content) => true,
            (NodeKind::Content, NodeKind::Row | NodeKind::Resizer) => true,
            (NodeKind::Row, NodeKind::Cell { .. } | NodeKind::Resizer) => true,
            (NodeKind::Cell { cell: CellKind::Grid }, NodeKind::Grid { .. }) => true,
            (NodeKind::Cell { cell: CellKind::Placeholder }, NodeKind::Placeholder) => true,
            _ => false,
        }
    }
}

/// A node of the grid tree. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Inserted by design mode rather than authored
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: None,
            attributes: Attributes::new(),
            children: Vec::new(),
            generated: false,
        }
    }

    /// `mainGrid` root with an empty content container
    pub fn main_grid(name: impl Into<String>) -> Self {
        Self::new(NodeKind::MainGrid { name: name.into() }).with_child(Self::new(NodeKind::Content))
    }

    /// Nested grid with an empty content container
    pub fn grid(name: Option<String>) -> Self {
        Self::new(NodeKind::Grid { name }).with_child(Self::new(NodeKind::Content))
    }

    pub fn row() -> Self {
        Self::new(NodeKind::Row)
    }

    pub fn resizer() -> Self {
        Self::new(NodeKind::Resizer)
    }

    pub fn module_cell(component: impl Into<String>, attributes: Attributes) -> Self {
        let mut cell = Self::new(NodeKind::Cell {
            cell: CellKind::Module {
                component: component.into(),
            },
        });
        cell.attributes = attributes;
        cell
    }

    pub fn grid_cell(grid: Node) -> Self {
        Self::new(NodeKind::Cell {
            cell: CellKind::Grid,
        })
        .with_child(grid)
    }

    /// Placeholder cell with its drop surface
    pub fn placeholder_cell() -> Self {
        Self::new(NodeKind::Cell {
            cell: CellKind::Placeholder,
        })
        .with_child(Self::new(NodeKind::Placeholder))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Mark this node and its whole subtree as design-mode generated
    pub fn into_generated(mut self) -> Self {
        self.set_generated(true);
        self
    }

    fn set_generated(&mut self, generated: bool) {
        self.generated = generated;
        for child in &mut self.children {
            child.set_generated(generated);
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn is_grid(&self) -> bool {
        matches!(self.kind, NodeKind::MainGrid { .. } | NodeKind::Grid { .. })
    }

    pub fn is_row(&self) -> bool {
        matches!(self.kind, NodeKind::Row)
    }

    pub fn is_cell(&self) -> bool {
        matches!(self.kind, NodeKind::Cell { .. })
    }

    pub fn is_resizer(&self) -> bool {
        matches!(self.kind, NodeKind::Resizer)
    }

    pub fn is_module_cell(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Cell {
                cell: CellKind::Module { .. }
            }
        )
    }

    pub fn is_grid_cell(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Cell {
                cell: CellKind::Grid
            }
        )
    }

    pub fn is_placeholder_cell(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Cell {
                cell: CellKind::Placeholder
            }
        )
    }

    /// Component type name of a module cell
    pub fn component(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Cell {
                cell: CellKind::Module { component },
            } => Some(component),
            _ => None,
        }
    }

    /// Name of a grid node (main or nested)
    pub fn grid_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::MainGrid { name } => Some(name),
            NodeKind::Grid { name } => name.as_deref(),
            _ => None,
        }
    }

    /// The grid held by a grid cell
    pub fn sub_grid(&self) -> Option<&Node> {
        if self.is_grid_cell() {
            self.children.iter().find(|c| c.is_grid())
        } else {
            None
        }
    }

    /// Content container of a grid
    pub fn content(&self) -> Option<&Node> {
        if self.is_grid() {
            self.children
                .iter()
                .find(|c| matches!(c.kind, NodeKind::Content))
        } else {
            None
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Node> {
        if self.is_grid() {
            self.children
                .iter_mut()
                .find(|c| matches!(c.kind, NodeKind::Content))
        } else {
            None
        }
    }

    /// Rows and resizers of a grid, cells and resizers of a row
    pub fn structural_children(&self) -> &[Node] {
        if self.is_grid() {
            self.content().map(|c| c.children.as_slice()).unwrap_or(&[])
        } else if self.is_row() || matches!(self.kind, NodeKind::Content) {
            &self.children
        } else {
            &[]
        }
    }

    pub fn structural_children_mut(&mut self) -> Option<&mut Vec<Node>> {
        if self.is_grid() {
            self.content_mut().map(|c| &mut c.children)
        } else if self.is_row() || matches!(self.kind, NodeKind::Content) {
            Some(&mut self.children)
        } else {
            None
        }
    }

    /// Rows of a grid (resizers skipped)
    pub fn rows(&self) -> impl Iterator<Item = &Node> {
        self.structural_children().iter().filter(|n| n.is_row())
    }

    /// Cells of a row (resizers skipped)
    pub fn cells(&self) -> impl Iterator<Item = &Node> {
        let cells: &[Node] = if self.is_row() { &self.children } else { &[] };
        cells.iter().filter(|n| n.is_cell())
    }

    /// Pre-order traversal of this node and all its descendants
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Module cells of the subtree in document order
    pub fn module_cells(&self) -> impl Iterator<Item = &Node> {
        self.descendants().filter(|n| n.is_module_cell())
    }

    /// True if the subtree holds a nested grid cell
    pub fn contains_sub_grid(&self) -> bool {
        self.descendants().any(|n| n.is_grid_cell())
    }

    /// Proportional weight among siblings, defaulting to 1
    pub fn relative_size(&self) -> f64 {
        self.attribute(SIZE_ATTRIBUTE)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(1.0)
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.descendants().find(|n| n.id() == Some(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Child indices leading from this node to the node with `id`
    pub fn path_to(&self, id: &str) -> Option<Vec<usize>> {
        if self.id() == Some(id) {
            return Some(Vec::new());
        }
        for (index, child) in self.children.iter().enumerate() {
            if let Some(mut path) = child.path_to(id) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.children.get(*first)?.node_at(rest),
        }
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.children.get_mut(*first)?.node_at_mut(rest),
        }
    }

    /// Check nesting rules for this subtree, collecting ids along the way
    fn check(&self, ids: &mut HashSet<String>) -> Result<(), StructureError> {
        if let Some(id) = &self.id {
            if !ids.insert(id.clone()) {
                return Err(StructureError::DuplicateId(id.clone()));
            }
        }

        for child in &self.children {
            if matches!(child.kind, NodeKind::MainGrid { .. }) {
                return Err(StructureError::NestedMainGrid);
            }
            if !self.kind.allows_child(&child.kind) {
                return Err(StructureError::InvalidNesting {
                    parent: self.kind.tag_name().to_string(),
                    child: child.kind.tag_name().to_string(),
                });
            }
        }

        match &self.kind {
            NodeKind::MainGrid { .. } | NodeKind::Grid { .. } if self.children.len() != 1 => {
                return Err(StructureError::ChildCount {
                    kind: self.kind.tag_name().to_string(),
                    expected: "exactly one content".to_string(),
                    found: self.children.len(),
                });
            }
            NodeKind::Cell {
                cell: CellKind::Grid,
            } if self.children.len() != 1 => {
                return Err(StructureError::ChildCount {
                    kind: "grid cell".to_string(),
                    expected: "exactly one grid".to_string(),
                    found: self.children.len(),
                });
            }
            NodeKind::Cell {
                cell: CellKind::Placeholder,
            } if self.children.len() > 1 => {
                return Err(StructureError::ChildCount {
                    kind: "placeholder cell".to_string(),
                    expected: "at most one placeholder".to_string(),
                    found: self.children.len(),
                });
            }
            NodeKind::Content | NodeKind::Row => check_resizer_positions(&self.children)?,
            _ => {}
        }

        for child in &self.children {
            child.check(ids)?;
        }
        Ok(())
    }
}

/// Resizers may only sit between two non-resizer siblings
fn check_resizer_positions(siblings: &[Node]) -> Result<(), StructureError> {
    for (index, node) in siblings.iter().enumerate() {
        if !node.is_resizer() {
            continue;
        }
        let before = index.checked_sub(1).and_then(|i| siblings.get(i));
        let after = siblings.get(index + 1);
        let sandwiched = matches!((before, after), (Some(b), Some(a)) if !b.is_resizer() && !a.is_resizer());
        if !sandwiched {
            return Err(StructureError::DanglingResizer(
                node.id.clone().unwrap_or_default(),
            ));
        }
    }
    Ok(())
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Named grid document: a `mainGrid` tree plus its id generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDocument {
    pub name: String,
    pub root: Node,
    /// Module cell currently holding focus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<String>,
    pub ids: IdGenerator,
}

impl GridDocument {
    /// Wrap a `mainGrid` root; ids are not assigned
    pub fn from_root(root: Node) -> Result<Self, StructureError> {
        let name = match &root.kind {
            NodeKind::MainGrid { name } => name.clone(),
            other => return Err(StructureError::RootNotMainGrid(other.tag_name().to_string())),
        };
        let ids = IdGenerator::new(&name);
        Ok(Self {
            name,
            root,
            focused: None,
            ids,
        })
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Ancestor chain (root first) ending with the node itself
    pub fn ancestors_of(&self, id: &str) -> Option<Vec<&Node>> {
        let path = self.root.path_to(id)?;
        let mut chain = vec![&self.root];
        let mut current = &self.root;
        for index in path {
            current = current.children.get(index)?;
            chain.push(current);
        }
        Some(chain)
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        let chain = self.ancestors_of(id)?;
        chain.len().checked_sub(2).map(|i| chain[i])
    }

    /// Nearest grid enclosing the node (the node itself if it is a grid)
    pub fn enclosing_grid(&self, id: &str) -> Option<&Node> {
        self.ancestors_of(id)?.into_iter().rev().find(|n| n.is_grid())
    }

    /// Grid addressed by name (main or nested) or by id
    pub fn find_grid(&self, name: &str) -> Option<&Node> {
        self.root
            .descendants()
            .filter(|n| n.is_grid())
            .find(|n| n.grid_name() == Some(name) || n.id() == Some(name))
    }

    pub fn all_ids(&self) -> Vec<&str> {
        self.root.descendants().filter_map(Node::id).collect()
    }

    /// Fresh id not present anywhere in the tree
    pub fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.new_id();
            if self.root.find(&id).is_none() {
                return id;
            }
        }
    }

    /// Give every node without an id a fresh one (depth-first). Existing ids are kept.
    pub fn assign_ids(&mut self) {
        let existing: HashSet<String> = self.all_ids().into_iter().map(str::to_string).collect();
        let mut ids = self.ids.clone();
        assign_missing(&mut self.root, &mut ids, &existing);
        self.ids = ids;
    }

    /// Check every structural invariant of the document
    pub fn validate(&self) -> Result<(), StructureError> {
        if !matches!(self.root.kind, NodeKind::MainGrid { .. }) {
            return Err(StructureError::RootNotMainGrid(
                self.root.kind.tag_name().to_string(),
            ));
        }
        let mut ids = HashSet::new();
        self.root.check(&mut ids)?;

        let mut names = HashSet::new();
        for grid in self.root.descendants().filter(|n| n.is_grid()) {
            if let Some(name) = grid.grid_name() {
                if !names.insert(name) {
                    return Err(StructureError::DuplicateGridName(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Module cells of the whole document in document order
    pub fn module_cells(&self) -> impl Iterator<Item = &Node> {
        self.root.module_cells()
    }
}

fn assign_missing(node: &mut Node, ids: &mut IdGenerator, existing: &HashSet<String>) {
    if node.id.is_none() {
        let mut id = ids.new_id();
        while existing.contains(&id) {
            id = ids.new_id();
        }
        node.id = Some(id);
    }
    for child in &mut node.children {
        assign_missing(child, ids, existing);
    }
}

/// Weak reference to a node: resolved by document name and id, never owning
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub document: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(document: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            id: id.into(),
        }
    }

    /// Resolve against a document; `None` if it belongs elsewhere or is gone
    pub fn resolve<'a>(&self, doc: &'a GridDocument) -> Option<&'a Node> {
        if doc.name == self.document {
            doc.find_node(&self.id)
        } else {
            None
        }
    }
}
