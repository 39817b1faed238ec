//! # Grid Manipulator
//!
//! Pure transforms over grid documents. Every function works on a private
//! clone of its input and returns the new document, so a failed validation
//! leaves the caller's document untouched.
//!
//! ## Design-mode decoration
//!
//! In design mode every row is laid out as
//!
//! ```text
//! [P] cell [R] [P] cell [R] [P] cell [P]
//! ```
//!
//! where `P` is a generated placeholder cell and `R` a generated resizer.
//! Adjacent rows get a generated resizer between them, and an empty grid
//! gets a generated row holding a single placeholder. Authored placeholders
//! and resizers are reused rather than duplicated.

use crate::errors::EditError;
use gridkit_parser::view::is_sizable;
use gridkit_parser::ast::SIZE_ATTRIBUTE;
use gridkit_parser::{Attributes, GridDocument, GridView, Node};

/// Minimal valid document: a `mainGrid` root with an empty content container
pub fn create_base_grid(name: &str) -> Result<GridDocument, EditError> {
    if name.trim().is_empty() {
        return Err(EditError::InvalidName(name.to_string()));
    }
    let mut doc = GridDocument::from_root(Node::main_grid(name))
        .map_err(|e| EditError::InvalidName(e.to_string()))?;
    doc.assign_ids();
    Ok(doc)
}

/// Assign fresh ids to nodes lacking one; existing ids are kept
pub fn assign_ids(doc: &GridDocument) -> GridDocument {
    let mut work = doc.clone();
    work.assign_ids();
    work
}

pub fn find_node_by_id<'a>(doc: &'a GridDocument, id: &str) -> Option<&'a Node> {
    doc.find_node(id)
}

/// True iff the subtree rooted at `node` holds a nested grid cell
pub fn contains_sub_grid(node: &Node) -> bool {
    node.contains_sub_grid()
}

/// Proportional weight of a row or cell, default 1
pub fn relative_size_of(node: &Node) -> f64 {
    node.relative_size()
}

/// Path from the root to the grid addressed by `name`
fn grid_path(doc: &GridDocument, name: &str) -> Result<Vec<usize>, EditError> {
    let grid = doc
        .find_grid(name)
        .ok_or_else(|| EditError::GridNotFound(name.to_string()))?;
    let id = grid
        .id()
        .ok_or_else(|| EditError::GridNotFound(name.to_string()))?;
    doc.root
        .path_to(id)
        .ok_or_else(|| EditError::GridNotFound(name.to_string()))
}

fn node_path(doc: &GridDocument, id: &str) -> Result<Vec<usize>, EditError> {
    doc.root
        .path_to(id)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))
}

/// Append a module cell to the last row of the named grid (creating the
/// row if the grid has none). Returns the new document and the cell id.
pub fn insert_module(
    doc: &GridDocument,
    grid_name: &str,
    component: &str,
    attributes: Attributes,
) -> Result<(GridDocument, String), EditError> {
    let mut work = doc.clone();
    let path = grid_path(&work, grid_name)?;

    let has_row = work
        .root
        .node_at(&path)
        .map(|grid| grid.rows().next().is_some())
        .unwrap_or(false);
    let row_id = if has_row { None } else { Some(work.fresh_id()) };
    let cell_id = work.fresh_id();
    let cell = Node::module_cell(component, attributes).with_id(cell_id.clone());

    let siblings = work
        .root
        .node_at_mut(&path)
        .and_then(Node::structural_children_mut)
        .ok_or_else(|| EditError::GridNotFound(grid_name.to_string()))?;

    match (siblings.iter().rposition(Node::is_row), row_id) {
        (Some(index), _) => append_cell(&mut siblings[index], cell),
        (None, Some(row_id)) => siblings.push(Node::row().with_id(row_id).with_child(cell)),
        (None, None) => return Err(EditError::GridNotFound(grid_name.to_string())),
    }

    work.assign_ids();
    Ok((work, cell_id))
}

/// Append a cell to a row, making the row authored. A trailing generated
/// placeholder stays at the end.
fn append_cell(row: &mut Node, cell: Node) {
    row.generated = false;
    let at = match row.children.last() {
        Some(last) if last.generated && last.is_placeholder_cell() => row.children.len() - 1,
        _ => row.children.len(),
    };
    row.children.insert(at, cell);
}

/// Resolve a drop target to the id of its placeholder cell. Accepts the
/// cell itself or the `placeholder` surface inside it.
pub fn resolve_drop_slot(doc: &GridDocument, id: &str) -> Result<String, EditError> {
    let node = doc
        .find_node(id)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))?;
    if node.is_placeholder_cell() {
        return Ok(id.to_string());
    }
    if matches!(node.kind, gridkit_parser::NodeKind::Placeholder) {
        if let Some(cell_id) = doc.parent_of(id).and_then(Node::id) {
            return Ok(cell_id.to_string());
        }
    }
    Err(EditError::WrongKind {
        id: id.to_string(),
        expected: "placeholder",
    })
}

/// Move a module cell into a placeholder slot. The module's old position
/// becomes a (generated) placeholder; the destination placeholder is
/// replaced by the module.
pub fn move_module(
    doc: &GridDocument,
    module_id: &str,
    placeholder_id: &str,
) -> Result<GridDocument, EditError> {
    let mut work = doc.clone();

    let module = work
        .find_node(module_id)
        .ok_or_else(|| EditError::NodeNotFound(module_id.to_string()))?;
    if !module.is_module_cell() {
        return Err(EditError::WrongKind {
            id: module_id.to_string(),
            expected: "module cell",
        });
    }

    let slot_id = resolve_drop_slot(&work, placeholder_id)?;
    let module_path = node_path(&work, module_id)?;
    let slot_path = node_path(&work, &slot_id)?;
    if slot_path.starts_with(&module_path) {
        return Err(EditError::InvalidMove(format!(
            "{} lies inside the moved module {}",
            placeholder_id, module_id
        )));
    }

    let vacated = Node::placeholder_cell().into_generated();

    let module = work
        .root
        .node_at_mut(&module_path)
        .map(|slot| std::mem::replace(slot, vacated))
        .ok_or_else(|| EditError::NodeNotFound(module_id.to_string()))?;

    let slot = work
        .root
        .node_at_mut(&slot_path)
        .ok_or_else(|| EditError::NodeNotFound(slot_id.clone()))?;
    *slot = module;

    // A module dropped into generated scaffolding makes it authored
    for depth in 0..slot_path.len() {
        if let Some(ancestor) = work.root.node_at_mut(&slot_path[..depth]) {
            ancestor.generated = false;
        }
    }

    work.assign_ids();
    Ok(work)
}

/// Remove a row, a cell or a nested grid. Resizers left dangling by the
/// removal are dropped too.
pub fn remove_node(doc: &GridDocument, id: &str) -> Result<GridDocument, EditError> {
    let mut work = doc.clone();
    let path = node_path(&work, id)?;

    let target = work
        .root
        .node_at(&path)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))?;
    if !(target.is_row() || target.is_cell()) {
        return Err(EditError::WrongKind {
            id: id.to_string(),
            expected: "row or cell",
        });
    }

    let (index, parent_path) = match path.split_last() {
        Some((index, parent)) => (*index, parent.to_vec()),
        None => return Err(EditError::InvalidMove("cannot remove the root".to_string())),
    };
    let parent = work
        .root
        .node_at_mut(&parent_path)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))?;
    parent.children.remove(index);
    tidy_resizers(&mut parent.children);

    if work.focused.as_deref().map_or(false, |f| work.root.find(f).is_none()) {
        work.focused = None;
    }
    Ok(work)
}

pub fn set_attribute(
    doc: &GridDocument,
    id: &str,
    key: &str,
    value: &str,
) -> Result<GridDocument, EditError> {
    let mut work = doc.clone();
    let node = work
        .find_node_mut(id)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))?;
    node.attributes.insert(key.to_string(), value.to_string());
    Ok(work)
}

/// Commit new relative sizes (e.g. at the end of a resize)
pub fn set_relative_sizes(doc: &GridDocument, sizes: &[(String, f64)]) -> Result<GridDocument, EditError> {
    let mut work = doc.clone();
    for (id, size) in sizes {
        let node = work
            .find_node_mut(id)
            .ok_or_else(|| EditError::NodeNotFound(id.clone()))?;
        if !is_sizable(node) {
            return Err(EditError::WrongKind {
                id: id.clone(),
                expected: "row or cell",
            });
        }
        node.attributes
            .insert(SIZE_ATTRIBUTE.to_string(), format_size(*size));
    }
    Ok(work)
}

/// Sizes are stored with four decimals, trailing zeros dropped
pub fn format_size(size: f64) -> String {
    let rounded = (size * 10_000.0).round() / 10_000.0;
    format!("{}", rounded)
}

/// Append a cell holding a new empty nested grid to the named grid
pub fn add_grid(
    doc: &GridDocument,
    parent_grid: &str,
    name: Option<&str>,
) -> Result<(GridDocument, String), EditError> {
    if let Some(name) = name {
        if name.trim().is_empty() || doc.find_grid(name).is_some() {
            return Err(EditError::InvalidName(name.to_string()));
        }
    }
    let path = grid_path(doc, parent_grid)?;

    let mut work = doc.clone();
    let grid_id = work.fresh_id();
    let grid = Node::grid(name.map(str::to_string)).with_id(grid_id.clone());
    let cell = Node::grid_cell(grid);

    let siblings = work
        .root
        .node_at_mut(&path)
        .and_then(Node::structural_children_mut)
        .ok_or_else(|| EditError::GridNotFound(parent_grid.to_string()))?;

    match siblings.iter().rposition(Node::is_row) {
        Some(index) => append_cell(&mut siblings[index], cell),
        None => siblings.push(Node::row().with_child(cell)),
    }

    work.assign_ids();
    Ok((work, grid_id))
}

/// Ordinal of the focused module among the grid's module pages
pub fn compute_focus_index(doc: &GridDocument, grid_name: &str) -> Result<Option<usize>, EditError> {
    let grid = doc
        .find_grid(grid_name)
        .ok_or_else(|| EditError::GridNotFound(grid_name.to_string()))?;
    let focused = match doc.focused.as_deref() {
        Some(id) => id,
        None => return Ok(None),
    };
    Ok(grid.module_cells().position(|cell| cell.id() == Some(focused)))
}

/// Module ids per row of the named grid, nested grids flattened into their row
pub fn module_matrix(doc: &GridDocument, grid_name: &str) -> Result<Vec<Vec<String>>, EditError> {
    doc.find_grid(grid_name)
        .and_then(GridView::new)
        .map(|grid| {
            grid.module_matrix()
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect()
        })
        .ok_or_else(|| EditError::GridNotFound(grid_name.to_string()))
}

/// Move focus to a module cell
pub fn set_focus(doc: &GridDocument, module_id: &str) -> Result<GridDocument, EditError> {
    let node = doc
        .find_node(module_id)
        .ok_or_else(|| EditError::NodeNotFound(module_id.to_string()))?;
    if !node.is_module_cell() {
        return Err(EditError::WrongKind {
            id: module_id.to_string(),
            expected: "module cell",
        });
    }
    let mut work = doc.clone();
    work.focused = Some(module_id.to_string());
    Ok(work)
}

/// The two sizable siblings a resizer sits between
pub fn resize_neighbours(doc: &GridDocument, resizer_id: &str) -> Result<(String, String), EditError> {
    let resizer = doc
        .find_node(resizer_id)
        .ok_or_else(|| EditError::NodeNotFound(resizer_id.to_string()))?;
    if !resizer.is_resizer() {
        return Err(EditError::WrongKind {
            id: resizer_id.to_string(),
            expected: "resizer",
        });
    }
    let parent = doc
        .parent_of(resizer_id)
        .ok_or_else(|| EditError::DetachedNode(resizer_id.to_string()))?;
    let siblings = &parent.children;
    let index = siblings
        .iter()
        .position(|n| n.id() == Some(resizer_id))
        .ok_or_else(|| EditError::DetachedNode(resizer_id.to_string()))?;

    let before = siblings[..index].iter().rev().find(|n| is_sizable(n));
    let after = siblings[index + 1..].iter().find(|n| is_sizable(n));
    match (before.and_then(Node::id), after.and_then(Node::id)) {
        (Some(before), Some(after)) => Ok((before.to_string(), after.to_string())),
        _ => Err(EditError::InvalidMove(format!(
            "resizer {} has nothing to resize",
            resizer_id
        ))),
    }
}

/// True if design-mode scaffolding is present
pub fn is_decorated(doc: &GridDocument) -> bool {
    doc.root.descendants().any(|n| n.generated)
}

/// Insert placeholders and resizers for design mode
pub fn decorate_for_design(doc: &GridDocument) -> GridDocument {
    let mut work = doc.clone();
    decorate_node(&mut work.root);
    work.assign_ids();
    work
}

fn decorate_node(node: &mut Node) {
    if node.is_grid() {
        if let Some(content) = node.content_mut() {
            decorate_content(&mut content.children);
        }
    }
    for child in &mut node.children {
        decorate_node(child);
    }
}

fn decorate_content(children: &mut Vec<Node>) {
    if !children.iter().any(Node::is_row) {
        children.clear();
        children.push(Node::row().with_child(Node::placeholder_cell()).into_generated());
        return;
    }

    let authored = std::mem::take(children);
    let mut previous_was_row = false;
    for child in authored {
        let is_row = child.is_row();
        if is_row && previous_was_row {
            children.push(Node::resizer().into_generated());
        }
        previous_was_row = is_row;
        let mut child = child;
        if is_row {
            decorate_row(&mut child.children);
        }
        children.push(child);
    }
}

fn decorate_row(children: &mut Vec<Node>) {
    // gaps[i] holds the non-sizable nodes in front of cells[i]; the last gap trails
    let mut gaps: Vec<Vec<Node>> = vec![Vec::new()];
    let mut cells: Vec<Node> = Vec::new();
    for child in std::mem::take(children) {
        if is_sizable(&child) {
            cells.push(child);
            gaps.push(Vec::new());
        } else if let Some(gap) = gaps.last_mut() {
            gap.push(child);
        }
    }

    let count = cells.len();
    let mut cells = cells.into_iter();
    for (index, gap) in gaps.into_iter().enumerate() {
        let interior = index > 0 && index < count;
        if interior && !gap.iter().any(Node::is_resizer) {
            children.push(Node::resizer().into_generated());
        }
        let has_placeholder = gap.iter().any(Node::is_placeholder_cell);
        children.extend(gap);
        if !has_placeholder {
            children.push(Node::placeholder_cell().into_generated());
        }
        if let Some(cell) = cells.next() {
            children.push(cell);
        }
    }
}

/// Remove every generated node (and resizers left dangling by that)
pub fn strip_generated(doc: &GridDocument) -> GridDocument {
    let mut work = doc.clone();
    strip_node(&mut work.root);
    work
}

fn strip_node(node: &mut Node) {
    let before = node.children.len();
    node.children.retain(|c| !c.generated);
    if node.children.len() != before {
        tidy_resizers(&mut node.children);
    }
    for child in &mut node.children {
        strip_node(child);
    }
}

/// Drop leading, trailing and doubled resizers
fn tidy_resizers(siblings: &mut Vec<Node>) {
    let mut tidy: Vec<Node> = Vec::with_capacity(siblings.len());
    for node in std::mem::take(siblings) {
        let after_resizer_or_start = tidy.last().map(Node::is_resizer).unwrap_or(true);
        if node.is_resizer() && after_resizer_or_start {
            continue;
        }
        tidy.push(node);
    }
    while tidy.last().map(Node::is_resizer).unwrap_or(false) {
        tidy.pop();
    }
    *siblings = tidy;
}

/// Bring a document in line with the design-mode status
pub fn normalize_design_layout(doc: &GridDocument, design_mode: bool) -> Option<GridDocument> {
    match (design_mode, is_decorated(doc)) {
        (true, false) => Some(decorate_for_design(doc)),
        (false, true) => Some(strip_generated(doc)),
        _ => None,
    }
}

/// Strip and decorate again so every slot has exactly one placeholder
pub fn refresh_design_layout(doc: &GridDocument) -> GridDocument {
    decorate_for_design(&strip_generated(doc))
}
