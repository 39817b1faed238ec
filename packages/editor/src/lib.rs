//! # Gridkit Editor
//!
//! State management for drag-and-drop grid layouts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: structural text → GridDocument      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Store                               │
//! │  - Registry of named grids                  │
//! │  - Design-mode / drag state machine         │
//! │  - Pure manipulator transforms              │
//! │  - Snapshot history (undo/redo)             │
//! │  - Hierarchical event channel               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ presentation layer (subscribes to events)   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gridkit_editor::Store;
//!
//! let mut store = Store::new();
//! store.create_grid("Dashboard")?;
//! let chart = store.add_module("Dashboard", "Dashboard", "Chart", Default::default())?;
//!
//! store.subscribe("grid.designMode.**", |event| {
//!     println!("{}", event.name);
//!     Ok(())
//! });
//!
//! store.enter_design_mode("Dashboard")?;
//! store.start_dragging("Dashboard", &chart)?;
//! store.start_hovering("Dashboard", &placeholder)?;
//! store.drop("Dashboard")?;
//! store.undo("Dashboard")?;
//! ```

pub mod actions;
pub mod clock;
pub mod config;
pub mod design_mode;
pub mod edits;
mod errors;
pub mod events;
pub mod history;
pub mod manipulator;
pub mod module;
pub mod navigation;
pub mod store;

pub use actions::Action;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EditorConfig};
pub use design_mode::{DesignModeState, DesignModeStatus, DragState, ResizeSession};
pub use edits::{Edit, EditResult};
pub use errors::{EditError, StoreError};
pub use events::{Event, EventChannel, EventDetail, SubscriptionId};
pub use history::{History, HistoryEntry};
pub use module::{render_modules, ModuleKey, ModuleRenderer};
pub use navigation::Direction;
pub use store::Store;

// Re-export common types for convenience
pub use gridkit_parser::{parse, serialize, Attributes, GridDocument, Node, NodeRef};
