//! Error types for the editor

use thiserror::Error;

/// Failures of the pure tree transforms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid grid name: {0:?}")]
    InvalidName(String),

    #[error("Grid not found: {0}")]
    GridNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node is not attached to any grid: {0}")]
    DetachedNode(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Node {id} is not a {expected}")]
    WrongKind { id: String, expected: &'static str },
}

/// Failures surfaced by the store and its state machine
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Malformed structure: {0}")]
    Parse(#[from] gridkit_parser::ParseError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Unknown grid: {0}")]
    UnknownGrid(String),

    #[error("Grid already registered: {0}")]
    DuplicateGrid(String),

    #[error("Grid {0} is not in design mode")]
    NotInDesignMode(String),

    #[error("Nothing is hovered in grid {0}")]
    NoActiveHover(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },
}

impl StoreError {
    pub fn invalid_transition(action: impl Into<String>, state: impl Into<String>) -> Self {
        Self::InvalidTransition {
            action: action.into(),
            state: state.into(),
        }
    }

    /// Rejections that leave everything untouched and are not faults
    pub fn is_no_op(&self) -> bool {
        matches!(
            self,
            StoreError::NoActiveHover(_) | StoreError::NotInDesignMode(_)
        )
    }
}
