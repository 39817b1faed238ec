//! # Grid Edits
//!
//! Serializable, intent-preserving operations on a grid document. An `Edit`
//! names what should happen; the manipulator does the work.
//!
//! ## Semantics
//!
//! ### MoveModule
//! - Atomic: the module lands in the placeholder and leaves a placeholder behind
//! - Fails if the destination lies inside the moved module
//!
//! ### RemoveNode
//! - Removes the node and all descendants
//! - Resizers left without a neighbour go with it
//!
//! ### SetRelativeSizes
//! - Last write wins, no merging

use crate::errors::EditError;
use crate::manipulator;
use gridkit_parser::{Attributes, GridDocument};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "edit", rename_all = "camelCase")]
pub enum Edit {
    /// Append a module cell to the last row of a grid
    InsertModule {
        grid: String,
        component: String,
        #[serde(default)]
        attributes: Attributes,
    },

    /// Move a module cell into a placeholder slot
    MoveModule { module: String, placeholder: String },

    RemoveNode { node: String },

    SetAttribute {
        node: String,
        key: String,
        value: String,
    },

    /// Commit proportional sizes, e.g. at the end of a resize
    SetRelativeSizes { sizes: Vec<(String, f64)> },

    /// Append a cell holding a new, empty nested grid
    AddGrid {
        parent: String,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Outcome of applying one edit
#[derive(Debug, Clone)]
pub struct EditResult {
    pub document: GridDocument,
    /// Id of the node the edit created, if any
    pub created: Option<String>,
}

impl Edit {
    /// Apply to a document, producing the next one. The input is never touched.
    pub fn apply(&self, doc: &GridDocument) -> Result<EditResult, EditError> {
        match self {
            Edit::InsertModule {
                grid,
                component,
                attributes,
            } => {
                let (document, id) =
                    manipulator::insert_module(doc, grid, component, attributes.clone())?;
                Ok(EditResult {
                    document,
                    created: Some(id),
                })
            }

            Edit::MoveModule {
                module,
                placeholder,
            } => Ok(EditResult {
                document: manipulator::move_module(doc, module, placeholder)?,
                created: None,
            }),

            Edit::RemoveNode { node } => Ok(EditResult {
                document: manipulator::remove_node(doc, node)?,
                created: None,
            }),

            Edit::SetAttribute { node, key, value } => Ok(EditResult {
                document: manipulator::set_attribute(doc, node, key, value)?,
                created: None,
            }),

            Edit::SetRelativeSizes { sizes } => Ok(EditResult {
                document: manipulator::set_relative_sizes(doc, sizes)?,
                created: None,
            }),

            Edit::AddGrid { parent, name } => {
                let (document, id) = manipulator::add_grid(doc, parent, name.as_deref())?;
                Ok(EditResult {
                    document,
                    created: Some(id),
                })
            }
        }
    }

    /// Event published when this edit is committed on its own
    pub fn event_name(&self) -> &'static str {
        match self {
            Edit::InsertModule { .. } => "grid.module.add",
            Edit::MoveModule { .. } => "grid.module.move",
            Edit::RemoveNode { .. } => "grid.node.remove",
            Edit::SetAttribute { .. } => "grid.node.attribute",
            Edit::SetRelativeSizes { .. } => "grid.node.resize",
            Edit::AddGrid { .. } => "grid.subGrid.add",
        }
    }

    /// History label
    pub fn label(&self) -> String {
        match self {
            Edit::InsertModule { component, .. } => format!("add module {}", component),
            Edit::MoveModule { module, .. } => format!("move module {}", module),
            Edit::RemoveNode { node } => format!("remove {}", node),
            Edit::SetAttribute { node, key, .. } => format!("set {} on {}", key, node),
            Edit::SetRelativeSizes { .. } => "resize".to_string(),
            Edit::AddGrid { .. } => "add grid".to_string(),
        }
    }
}
