//! # Grid Store
//!
//! Registry of named grid documents. Each grid owns a snapshot history and
//! its design-mode state; all grids share one event channel.
//!
//! Every mutation follows the same path:
//!
//! ```text
//! lookup → manipulator → commit snapshot → update state → publish one event
//! ```
//!
//! Subscribers run after the snapshot is committed, so they only ever see
//! the new state. Failed actions change nothing and publish nothing.

use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::design_mode::{DesignModeState, DesignModeStatus, DragState};
use crate::edits::Edit;
use crate::errors::{EditError, StoreError};
use crate::events::{self, Event, EventChannel, EventDetail, SubscriptionId};
use crate::history::History;
use crate::manipulator;
use crate::module::ModuleKey;
use gridkit_parser::{parse, Attributes, GridDocument, GridView, ParseError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Hover-stay notification waiting for its deadline
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingStay {
    pub placeholder: String,
    pub deadline: Duration,
}

#[derive(Debug)]
pub(crate) struct GridEntry {
    pub history: History,
    pub design: DesignModeState,
    /// Highest id counter ever handed out for this grid
    pub id_watermark: u64,
    pub pending_stay: Option<PendingStay>,
}

impl GridEntry {
    fn new(document: GridDocument, history_limit: usize) -> Self {
        let id_watermark = document.ids.count();
        Self {
            history: History::with_max_levels(document, history_limit),
            design: DesignModeState::default(),
            id_watermark,
            pending_stay: None,
        }
    }

    pub fn current(&self) -> &GridDocument {
        self.history.current()
    }

    /// Copy of the active snapshot whose id generator is past every id
    /// this grid has ever used
    pub fn working_copy(&self) -> GridDocument {
        let mut doc = (**self.history.current()).clone();
        doc.ids.advance_to(self.id_watermark);
        doc
    }

    fn note_ids(&mut self, doc: &GridDocument) {
        self.id_watermark = self.id_watermark.max(doc.ids.count());
    }

    /// Push a snapshot; in design mode the layout is refreshed first,
    /// otherwise generated scaffolding left by the edit is stripped
    pub fn push(&mut self, doc: GridDocument, label: Option<String>) -> Result<(), StoreError> {
        let doc = if self.design.status == DesignModeStatus::Enabled {
            manipulator::refresh_design_layout(&doc)
        } else {
            manipulator::normalize_design_layout(&doc, false).unwrap_or(doc)
        };
        doc.validate().map_err(ParseError::from)?;
        self.note_ids(&doc);
        self.history.push(doc, label);
        Ok(())
    }

    /// Replace the active snapshot without an undo step
    pub fn amend(&mut self, doc: GridDocument) {
        self.note_ids(&doc);
        self.history.amend(doc);
    }
}

/// Explicit context object holding every grid, the event channel, the
/// configuration and the clock
pub struct Store {
    pub(crate) grids: BTreeMap<String, GridEntry>,
    pub(crate) events: EventChannel,
    pub(crate) config: EditorConfig,
    pub(crate) clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("grids", &self.grids.keys().collect::<Vec<_>>())
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            grids: BTreeMap::new(),
            events: EventChannel::new(),
            config,
            clock: Box::new(SystemClock::new()),
        }
    }

    /// Swap the time source (tests drive hover timers with a `ManualClock`)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn subscribe<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub(crate) fn publish(&mut self, name: &str, grid: &str, detail: EventDetail) {
        let event = Event::new(name, grid, detail);
        self.events.publish(&event);
    }

    pub(crate) fn entry(&self, name: &str) -> Result<&GridEntry, StoreError> {
        self.grids
            .get(name)
            .ok_or_else(|| StoreError::UnknownGrid(name.to_string()))
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Result<&mut GridEntry, StoreError> {
        self.grids
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownGrid(name.to_string()))
    }

    // ---- registry ----

    /// Register a document under its name. Missing ids are assigned.
    pub fn add_grid(&mut self, mut document: GridDocument) -> Result<(), StoreError> {
        if self.grids.contains_key(&document.name) {
            return Err(StoreError::DuplicateGrid(document.name));
        }
        document.assign_ids();
        document.validate().map_err(ParseError::from)?;

        let name = document.name.clone();
        let root = document.root.id().unwrap_or_default().to_string();
        self.grids
            .insert(name.clone(), GridEntry::new(document, self.config.history_limit));
        tracing::info!("[add_grid] grid={}", name);
        self.publish(events::GRID_ADD, &name, EventDetail::Node { id: root });
        Ok(())
    }

    /// Register a fresh base grid
    pub fn create_grid(&mut self, name: &str) -> Result<(), StoreError> {
        let document = manipulator::create_base_grid(name)?;
        self.add_grid(document)
    }

    /// Parse a document from the structural text format and register it.
    /// Returns the grid's name.
    pub fn load_grid(&mut self, source: &str) -> Result<String, StoreError> {
        let document = parse(source)?;
        let name = document.name.clone();
        self.add_grid(document)?;
        Ok(name)
    }

    /// Unregister a grid, cancelling its drag state and timers
    pub fn remove_grid(&mut self, name: &str) -> Result<GridDocument, StoreError> {
        let entry = self
            .grids
            .remove(name)
            .ok_or_else(|| StoreError::UnknownGrid(name.to_string()))?;
        tracing::info!("[remove_grid] grid={}", name);
        self.publish(events::GRID_REMOVE, name, EventDetail::None);
        Ok((**entry.history.current()).clone())
    }

    /// Drop every grid without publishing anything
    pub fn clear(&mut self) {
        self.grids.clear();
    }

    pub fn grids(&self) -> impl Iterator<Item = &str> {
        self.grids.keys().map(String::as_str)
    }

    // ---- queries ----

    /// Active snapshot of a grid
    pub fn document(&self, name: &str) -> Result<&GridDocument, StoreError> {
        Ok(self.entry(name)?.current())
    }

    /// Shared handle on the active snapshot
    pub fn snapshot(&self, name: &str) -> Result<Arc<GridDocument>, StoreError> {
        Ok(Arc::clone(self.entry(name)?.history.current()))
    }

    pub fn has_placeholders(&self, name: &str) -> Result<bool, StoreError> {
        Ok(GridView::of_document(self.document(name)?).has_placeholders())
    }

    pub fn has_resizers(&self, name: &str) -> Result<bool, StoreError> {
        Ok(GridView::of_document(self.document(name)?).has_resizers())
    }

    pub fn design_mode_status(&self, name: &str) -> Result<DesignModeStatus, StoreError> {
        Ok(self.entry(name)?.design.status)
    }

    pub fn is_design_mode(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.design_mode_status(name)? == DesignModeStatus::Enabled)
    }

    pub fn drag_state(&self, name: &str) -> Result<&DragState, StoreError> {
        Ok(&self.entry(name)?.design.drag)
    }

    /// True while a module is being dragged (hovering included)
    pub fn is_dragging(&self, name: &str) -> Result<bool, StoreError> {
        Ok(matches!(
            self.drag_state(name)?,
            DragState::Dragging { .. } | DragState::Hovering { .. }
        ))
    }

    pub fn is_hovering(&self, name: &str) -> Result<bool, StoreError> {
        Ok(matches!(self.drag_state(name)?, DragState::Hovering { .. }))
    }

    pub fn is_resizing(&self, name: &str) -> Result<bool, StoreError> {
        Ok(matches!(self.drag_state(name)?, DragState::Resizing(_)))
    }

    /// Ordinal of the focused module among the grid's modules
    pub fn focused_module_cell_index(&self, name: &str) -> Result<Option<usize>, StoreError> {
        let doc = self.document(name)?;
        Ok(manipulator::compute_focus_index(doc, &doc.name)?)
    }

    pub fn focused_module(&self, name: &str) -> Result<Option<&str>, StoreError> {
        Ok(self.document(name)?.focused.as_deref())
    }

    /// Name of the registered grid whose tree holds `id`
    pub fn main_grid_of(&self, id: &str) -> Result<&str, StoreError> {
        self.grids
            .iter()
            .find(|(_, entry)| entry.current().contains(id))
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| EditError::DetachedNode(id.to_string()).into())
    }

    /// Keys of the module instances the current snapshot needs
    pub fn module_keys(&self, name: &str) -> Result<Vec<ModuleKey>, StoreError> {
        Ok(self
            .document(name)?
            .module_cells()
            .filter_map(ModuleKey::of)
            .collect())
    }

    pub fn can_undo(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entry(name)?.history.can_undo())
    }

    pub fn can_go_back(&self, name: &str) -> Result<bool, StoreError> {
        self.can_undo(name)
    }

    pub fn can_redo(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entry(name)?.history.can_redo())
    }

    // ---- history ----

    pub fn undo(&mut self, name: &str) -> Result<bool, StoreError> {
        self.travel(name, true)
    }

    pub fn redo(&mut self, name: &str) -> Result<bool, StoreError> {
        self.travel(name, false)
    }

    fn travel(&mut self, name: &str, back: bool) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        let action = if back { "undo" } else { "redo" };
        if !matches!(entry.design.drag, DragState::Idle) {
            return Err(StoreError::invalid_transition(action, entry.design.drag.describe()));
        }

        let label = if back {
            entry.history.undo_description().map(str::to_string)
        } else {
            entry.history.redo_description().map(str::to_string)
        };
        let moved = if back {
            entry.history.undo().is_some()
        } else {
            entry.history.redo().is_some()
        };
        if !moved {
            return Ok(false);
        }

        let design_mode = entry.design.status == DesignModeStatus::Enabled;
        if let Some(normalized) =
            manipulator::normalize_design_layout(&entry.working_copy(), design_mode)
        {
            entry.amend(normalized);
        }
        let cursor = entry.history.cursor();

        tracing::info!("[{}] grid={} cursor={}", action, name, cursor);
        let event = if back {
            events::HISTORY_UNDO
        } else {
            events::HISTORY_REDO
        };
        self.publish(event, name, EventDetail::History { cursor, label });
        Ok(true)
    }

    // ---- edits ----

    fn ensure_idle(&self, name: &str, action: &str) -> Result<(), StoreError> {
        let entry = self.entry(name)?;
        match &entry.design.drag {
            DragState::Idle => Ok(()),
            other => Err(StoreError::invalid_transition(action, other.describe())),
        }
    }

    /// Apply one edit as its own undo step. Returns the id of the node the
    /// edit created, if any.
    pub fn apply(&mut self, name: &str, edit: Edit) -> Result<Option<String>, StoreError> {
        self.ensure_idle(name, "edit")?;
        let entry = self.entry_mut(name)?;
        let result = edit.apply(&entry.working_copy())?;
        entry.push(result.document, Some(edit.label()))?;

        let detail = match (&edit, &result.created) {
            (Edit::InsertModule { component, .. }, Some(id)) => EventDetail::Module {
                id: id.clone(),
                component: component.clone(),
            },
            (Edit::MoveModule { module, placeholder }, _) => EventDetail::Move {
                module: module.clone(),
                placeholder: placeholder.clone(),
            },
            (Edit::RemoveNode { node: id }, _) | (Edit::SetAttribute { node: id, .. }, _) => {
                EventDetail::Node { id: id.clone() }
            }
            (_, Some(id)) => EventDetail::Node { id: id.clone() },
            _ => EventDetail::None,
        };
        tracing::info!("[apply] grid={} {}", name, edit.label());
        self.publish(edit.event_name(), name, detail);
        Ok(result.created)
    }

    /// Apply several edits as a single undo step with one `grid.batch`
    /// event. Nothing is committed if any edit fails.
    pub fn apply_batch(
        &mut self,
        name: &str,
        label: &str,
        edits: Vec<Edit>,
    ) -> Result<Vec<Option<String>>, StoreError> {
        self.ensure_idle(name, "edit")?;
        if edits.is_empty() {
            return Ok(Vec::new());
        }
        let entry = self.entry_mut(name)?;
        let mut doc = entry.working_copy();
        let mut created = Vec::with_capacity(edits.len());
        for edit in &edits {
            let result = edit.apply(&doc)?;
            doc = result.document;
            created.push(result.created);
        }
        entry.push(doc, Some(label.to_string()))?;

        tracing::info!("[apply_batch] grid={} edits={} label={}", name, edits.len(), label);
        self.publish(
            events::BATCH,
            name,
            EventDetail::Batch {
                count: edits.len(),
                label: label.to_string(),
            },
        );
        Ok(created)
    }

    /// Append a module to the last row of `grid` (a grid name inside the
    /// document, often the document itself)
    pub fn add_module(
        &mut self,
        name: &str,
        grid: &str,
        component: &str,
        attributes: Attributes,
    ) -> Result<String, StoreError> {
        let created = self.apply(
            name,
            Edit::InsertModule {
                grid: grid.to_string(),
                component: component.to_string(),
                attributes,
            },
        )?;
        created.ok_or_else(|| EditError::GridNotFound(grid.to_string()).into())
    }

    pub fn add_sub_grid(
        &mut self,
        name: &str,
        parent: &str,
        grid_name: Option<&str>,
    ) -> Result<String, StoreError> {
        let created = self.apply(
            name,
            Edit::AddGrid {
                parent: parent.to_string(),
                name: grid_name.map(str::to_string),
            },
        )?;
        created.ok_or_else(|| EditError::GridNotFound(parent.to_string()).into())
    }

    pub fn remove_node(&mut self, name: &str, id: &str) -> Result<(), StoreError> {
        self.apply(name, Edit::RemoveNode { node: id.to_string() })?;
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        name: &str,
        id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.apply(
            name,
            Edit::SetAttribute {
                node: id.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(store: &mut Store) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe("**", move |event| {
            sink.borrow_mut().push(event.name.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_registry() {
        let mut store = Store::new();
        let seen = recorder(&mut store);
        store.create_grid("G").unwrap();
        assert!(matches!(
            store.create_grid("G"),
            Err(StoreError::DuplicateGrid(_))
        ));
        assert!(matches!(
            store.document("H"),
            Err(StoreError::UnknownGrid(_))
        ));
        assert_eq!(store.grids().collect::<Vec<_>>(), vec!["G"]);

        store.remove_grid("G").unwrap();
        assert_eq!(store.grids().count(), 0);
        assert_eq!(*seen.borrow(), vec!["grid.add", "grid.remove"]);
    }

    #[test]
    fn test_failed_edit_publishes_nothing() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        let seen = recorder(&mut store);
        let before = store.document("G").unwrap().clone();

        let err = store.add_module("G", "nope", "X", Attributes::new());
        assert!(matches!(
            err,
            Err(StoreError::Edit(EditError::GridNotFound(_)))
        ));
        assert_eq!(store.document("G").unwrap(), &before);
        assert!(!store.can_undo("G").unwrap());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_undo_redo_ends_are_no_ops() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        assert!(!store.undo("G").unwrap());
        assert!(!store.redo("G").unwrap());

        store.add_module("G", "G", "A", Attributes::new()).unwrap();
        assert!(store.can_go_back("G").unwrap());
        assert!(store.undo("G").unwrap());
        assert!(store.can_redo("G").unwrap());
        assert!(store.redo("G").unwrap());
        assert!(!store.redo("G").unwrap());
    }

    #[test]
    fn test_ids_are_not_reissued_after_undo() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        let first = store.add_module("G", "G", "A", Attributes::new()).unwrap();
        store.undo("G").unwrap();
        let second = store.add_module("G", "G", "B", Attributes::new()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_batch_is_one_step() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        let seen = recorder(&mut store);
        let created = store
            .apply_batch(
                "G",
                "seed",
                vec![
                    Edit::InsertModule {
                        grid: "G".into(),
                        component: "A".into(),
                        attributes: Attributes::new(),
                    },
                    Edit::InsertModule {
                        grid: "G".into(),
                        component: "B".into(),
                        attributes: Attributes::new(),
                    },
                ],
            )
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(store.document("G").unwrap().module_cells().count(), 2);
        assert_eq!(*seen.borrow(), vec!["grid.batch"]);

        store.undo("G").unwrap();
        assert_eq!(store.document("G").unwrap().module_cells().count(), 0);
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        let result = store.apply_batch(
            "G",
            "broken",
            vec![
                Edit::InsertModule {
                    grid: "G".into(),
                    component: "A".into(),
                    attributes: Attributes::new(),
                },
                Edit::RemoveNode {
                    node: "missing".into(),
                },
            ],
        );
        assert!(result.is_err());
        assert_eq!(store.document("G").unwrap().module_cells().count(), 0);
        assert!(!store.can_undo("G").unwrap());
    }

    #[test]
    fn test_main_grid_of() {
        let mut store = Store::new();
        store.create_grid("G").unwrap();
        store.create_grid("H").unwrap();
        let id = store.add_module("H", "H", "A", Attributes::new()).unwrap();
        assert_eq!(store.main_grid_of(&id).unwrap(), "H");
        assert!(matches!(
            store.main_grid_of("nowhere"),
            Err(StoreError::Edit(EditError::DetachedNode(_)))
        ));
    }

    #[test]
    fn test_history_limit_from_config() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut store = Store::with_config(config);
        store.create_grid("G").unwrap();
        for component in ["A", "B", "C"] {
            store.add_module("G", "G", component, Attributes::new()).unwrap();
        }
        assert!(store.undo("G").unwrap());
        assert!(store.undo("G").unwrap());
        assert!(!store.undo("G").unwrap());
        assert_eq!(store.document("G").unwrap().module_cells().count(), 1);
    }
}
