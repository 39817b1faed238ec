//! Serializable action surface.
//!
//! Hosts (and the `gridkit replay` command) drive a `Store` with JSON such
//! as `{"action": "startDragging", "grid": "Dashboard", "module": "a1-4"}`.

use crate::errors::StoreError;
use crate::store::Store;
use gridkit_parser::Attributes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Register an empty base grid
    AddGrid { name: String },
    RemoveGrid { grid: String },

    EnterDesignMode { grid: String },
    ExitDesignMode { grid: String },

    StartDragging { grid: String, module: String },
    CancelDragging { grid: String },
    StartHovering { grid: String, placeholder: String },
    StopHovering { grid: String },
    Drop { grid: String },
    ArmDropDetection { grid: String },
    PointerActivity { grid: String },

    StartResizing { grid: String, resizer: String },
    ResizeMove { grid: String, delta: f64 },
    StopResizing { grid: String },
    CancelResizing { grid: String },

    Undo { grid: String },
    Redo { grid: String },

    FocusLeftModuleCell { grid: String },
    FocusRightModuleCell { grid: String },
    FocusTopModuleCell { grid: String },
    FocusBottomModuleCell { grid: String },
    FocusModule { grid: String, module: String },

    /// Append a module; `target` names a nested grid, default the grid itself
    AddModule {
        grid: String,
        #[serde(default)]
        target: Option<String>,
        component: String,
        #[serde(default)]
        attributes: Attributes,
    },
    AddSubGrid {
        grid: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    RemoveNode { grid: String, node: String },

    /// Fire due hover-stay notifications
    PollTimers,
}

impl Action {
    /// Grid the action addresses, if any
    pub fn grid(&self) -> Option<&str> {
        match self {
            Action::AddGrid { name } => Some(name.as_str()),
            Action::PollTimers => None,
            Action::RemoveGrid { grid }
            | Action::EnterDesignMode { grid }
            | Action::ExitDesignMode { grid }
            | Action::StartDragging { grid, .. }
            | Action::CancelDragging { grid }
            | Action::StartHovering { grid, .. }
            | Action::StopHovering { grid }
            | Action::Drop { grid }
            | Action::ArmDropDetection { grid }
            | Action::PointerActivity { grid }
            | Action::StartResizing { grid, .. }
            | Action::ResizeMove { grid, .. }
            | Action::StopResizing { grid }
            | Action::CancelResizing { grid }
            | Action::Undo { grid }
            | Action::Redo { grid }
            | Action::FocusLeftModuleCell { grid }
            | Action::FocusRightModuleCell { grid }
            | Action::FocusTopModuleCell { grid }
            | Action::FocusBottomModuleCell { grid }
            | Action::FocusModule { grid, .. }
            | Action::AddModule { grid, .. }
            | Action::AddSubGrid { grid, .. }
            | Action::RemoveNode { grid, .. } => Some(grid.as_str()),
        }
    }
}

impl Store {
    /// Run one action. Queries-with-no-effect (undo at the end of history,
    /// cancelling an idle drag, ...) succeed without publishing.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        tracing::debug!("[dispatch] {:?}", action);
        match action {
            Action::AddGrid { name } => self.create_grid(&name),
            Action::RemoveGrid { grid } => self.remove_grid(&grid).map(|_| ()),

            Action::EnterDesignMode { grid } => self.enter_design_mode(&grid).map(|_| ()),
            Action::ExitDesignMode { grid } => self.exit_design_mode(&grid).map(|_| ()),

            Action::StartDragging { grid, module } => self.start_dragging(&grid, &module),
            Action::CancelDragging { grid } => self.cancel_dragging(&grid).map(|_| ()),
            Action::StartHovering { grid, placeholder } => self.start_hovering(&grid, &placeholder),
            Action::StopHovering { grid } => self.stop_hovering(&grid).map(|_| ()),
            Action::Drop { grid } => self.drop(&grid),
            Action::ArmDropDetection { grid } => self.arm_drop_detection(&grid),
            Action::PointerActivity { grid } => self.pointer_activity(&grid).map(|_| ()),

            Action::StartResizing { grid, resizer } => self.start_resizing(&grid, &resizer),
            Action::ResizeMove { grid, delta } => self.resize_move(&grid, delta).map(|_| ()),
            Action::StopResizing { grid } => self.stop_resizing(&grid).map(|_| ()),
            Action::CancelResizing { grid } => self.cancel_resizing(&grid).map(|_| ()),

            Action::Undo { grid } => self.undo(&grid).map(|_| ()),
            Action::Redo { grid } => self.redo(&grid).map(|_| ()),

            Action::FocusLeftModuleCell { grid } => self.focus_left_module_cell(&grid).map(|_| ()),
            Action::FocusRightModuleCell { grid } => {
                self.focus_right_module_cell(&grid).map(|_| ())
            }
            Action::FocusTopModuleCell { grid } => self.focus_top_module_cell(&grid).map(|_| ()),
            Action::FocusBottomModuleCell { grid } => {
                self.focus_bottom_module_cell(&grid).map(|_| ())
            }
            Action::FocusModule { grid, module } => self.focus_module(&grid, &module).map(|_| ()),

            Action::AddModule {
                grid,
                target,
                component,
                attributes,
            } => {
                let target = target.unwrap_or_else(|| grid.clone());
                self.add_module(&grid, &target, &component, attributes)
                    .map(|_| ())
            }
            Action::AddSubGrid { grid, target, name } => {
                let target = target.unwrap_or_else(|| grid.clone());
                self.add_sub_grid(&grid, &target, name.as_deref()).map(|_| ())
            }
            Action::RemoveNode { grid, node } => self.remove_node(&grid, &node),

            Action::PollTimers => {
                self.poll_timers();
                Ok(())
            }
        }
    }
}
