//! # Design Mode
//!
//! Per-grid state machine for rearranging and resizing.
//!
//! ```text
//! lifecycle:  Disabled → Enabling → Enabled → Disabling → Disabled
//!
//! drag:       Idle ─start_dragging→ Dragging ─start_hovering→ Hovering
//!               ↑                      ↑ └──────stop_hovering────┘
//!               └── cancel_dragging ───┘            │
//!               └──────────────── drop ─────────────┘
//!
//! resize:     Idle ─start_resizing→ Resizing ─stop/cancel→ Idle
//! ```
//!
//! Entering design mode decorates the active snapshot with generated
//! placeholders and resizers; exiting strips them again. Neither creates an
//! undo step.

use crate::errors::{EditError, StoreError};
use crate::events::{self, EventDetail};
use crate::manipulator;
use crate::store::{PendingStay, Store};
use gridkit_parser::NodeRef;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DesignModeStatus {
    #[default]
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

/// A resize in progress: the two siblings either side of the resizer and
/// their sizes when the drag began
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub resizer: String,
    pub before: String,
    pub after: String,
    pub before_size: f64,
    pub after_size: f64,
    /// Clamped offset from the anchor, in relative-size units
    pub delta: f64,
}

impl ResizeSession {
    pub fn sizes(&self) -> ((String, f64), (String, f64)) {
        (
            (self.before.clone(), self.before_size + self.delta),
            (self.after.clone(), self.after_size - self.delta),
        )
    }

    /// Keep both siblings at or above `min`
    fn clamp(&self, delta: f64, min: f64) -> f64 {
        let low = min - self.before_size;
        let high = self.after_size - min;
        if low > high {
            0.0
        } else {
            delta.clamp(low, high)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        module: NodeRef,
        /// Waiting for pointer activity to decide between drop and cancel
        drop_detection: bool,
    },
    Hovering {
        module: NodeRef,
        placeholder: NodeRef,
        drop_detection: bool,
    },
    Resizing(ResizeSession),
}

impl DragState {
    pub fn describe(&self) -> &'static str {
        match self {
            DragState::Idle => "idle",
            DragState::Dragging { .. } => "dragging",
            DragState::Hovering { .. } => "hovering",
            DragState::Resizing(_) => "resizing",
        }
    }

    /// Module being dragged, if any
    pub fn module(&self) -> Option<&NodeRef> {
        match self {
            DragState::Dragging { module, .. } | DragState::Hovering { module, .. } => Some(module),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesignModeState {
    pub status: DesignModeStatus,
    pub drag: DragState,
}

impl Store {
    fn require_design_mode(&self, name: &str) -> Result<(), StoreError> {
        if self.entry(name)?.design.status == DesignModeStatus::Enabled {
            Ok(())
        } else {
            Err(StoreError::NotInDesignMode(name.to_string()))
        }
    }

    /// Decorate the grid for editing. Returns false if already enabled.
    pub fn enter_design_mode(&mut self, name: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        if entry.design.status == DesignModeStatus::Enabled {
            return Ok(false);
        }
        entry.design.status = DesignModeStatus::Enabling;
        let decorated = manipulator::refresh_design_layout(&entry.working_copy());
        entry.amend(decorated);
        entry.design.status = DesignModeStatus::Enabled;

        tracing::debug!("[design_mode] grid={} enabled", name);
        self.publish(events::DESIGN_MODE_ENTER, name, EventDetail::None);
        Ok(true)
    }

    /// Cancel any drag or resize, then strip the design decoration.
    /// Returns false if design mode was not enabled.
    pub fn exit_design_mode(&mut self, name: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        if entry.design.status != DesignModeStatus::Enabled {
            return Ok(false);
        }
        entry.design.status = DesignModeStatus::Disabling;
        entry.design.drag = DragState::Idle;
        entry.pending_stay = None;
        let stripped = manipulator::strip_generated(&entry.working_copy());
        entry.amend(stripped);
        entry.design.status = DesignModeStatus::Disabled;

        tracing::debug!("[design_mode] grid={} disabled", name);
        self.publish(events::DESIGN_MODE_EXIT, name, EventDetail::None);
        Ok(true)
    }

    pub fn start_dragging(&mut self, name: &str, module_id: &str) -> Result<(), StoreError> {
        self.require_design_mode(name)?;
        let entry = self.entry_mut(name)?;
        if !matches!(entry.design.drag, DragState::Idle) {
            return Err(StoreError::invalid_transition(
                "start dragging",
                entry.design.drag.describe(),
            ));
        }
        let module = entry
            .current()
            .find_node(module_id)
            .ok_or_else(|| EditError::NodeNotFound(module_id.to_string()))?;
        if !module.is_module_cell() {
            return Err(EditError::WrongKind {
                id: module_id.to_string(),
                expected: "module cell",
            }
            .into());
        }
        entry.design.drag = DragState::Dragging {
            module: NodeRef::new(name, module_id),
            drop_detection: false,
        };

        tracing::debug!("[dragging] grid={} module={}", name, module_id);
        self.publish(
            events::DRAGGING_START,
            name,
            EventDetail::Node {
                id: module_id.to_string(),
            },
        );
        Ok(())
    }

    /// Hover a placeholder (its cell or its inner drop surface) with the
    /// dragged module and schedule the stay notification
    pub fn start_hovering(&mut self, name: &str, placeholder_id: &str) -> Result<(), StoreError> {
        self.require_design_mode(name)?;
        let deadline = self.clock.now() + self.config.hover_stay_delay();
        let entry = self.entry_mut(name)?;
        let (module, drop_detection) = match &entry.design.drag {
            DragState::Dragging {
                module,
                drop_detection,
            }
            | DragState::Hovering {
                module,
                drop_detection,
                ..
            } => (module.clone(), *drop_detection),
            other => {
                return Err(StoreError::invalid_transition(
                    "start hovering",
                    other.describe(),
                ))
            }
        };
        let slot = manipulator::resolve_drop_slot(entry.current(), placeholder_id)?;

        entry.design.drag = DragState::Hovering {
            module: module.clone(),
            placeholder: NodeRef::new(name, slot.clone()),
            drop_detection,
        };
        entry.pending_stay = Some(PendingStay {
            placeholder: slot.clone(),
            deadline,
        });

        tracing::debug!("[hovering] grid={} placeholder={}", name, slot);
        self.publish(
            events::HOVERING_START,
            name,
            EventDetail::Hover {
                module: module.id,
                placeholder: slot,
            },
        );
        Ok(())
    }

    /// Leave the hovered placeholder. Returns false if nothing was hovered.
    pub fn stop_hovering(&mut self, name: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        let (module, placeholder, drop_detection) = match &entry.design.drag {
            DragState::Hovering {
                module,
                placeholder,
                drop_detection,
            } => (module.clone(), placeholder.clone(), *drop_detection),
            _ => return Ok(false),
        };
        entry.design.drag = DragState::Dragging {
            module: module.clone(),
            drop_detection,
        };
        entry.pending_stay = None;

        self.publish(
            events::HOVERING_STOP,
            name,
            EventDetail::Hover {
                module: module.id,
                placeholder: placeholder.id,
            },
        );
        Ok(true)
    }

    /// Move the dragged module into the hovered placeholder as one undo
    /// step. Anything but an active hover is rejected with `NoActiveHover`
    /// and changes nothing.
    pub fn drop(&mut self, name: &str) -> Result<(), StoreError> {
        let entry = self.entry_mut(name)?;
        let (module, placeholder) = match &entry.design.drag {
            DragState::Hovering {
                module,
                placeholder,
                ..
            } => (module.id.clone(), placeholder.id.clone()),
            _ => return Err(StoreError::NoActiveHover(name.to_string())),
        };

        let moved = manipulator::move_module(&entry.working_copy(), &module, &placeholder)?;
        entry.push(moved, Some(format!("move module {}", module)))?;
        entry.design.drag = DragState::Idle;
        entry.pending_stay = None;

        tracing::info!("[drop] grid={} module={} placeholder={}", name, module, placeholder);
        self.publish(
            events::DROP,
            name,
            EventDetail::Move {
                module,
                placeholder,
            },
        );
        Ok(())
    }

    /// Abandon any drag or resize. Returns false if there was nothing to
    /// cancel.
    pub fn cancel_dragging(&mut self, name: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        let previous = std::mem::take(&mut entry.design.drag);
        entry.pending_stay = None;

        let (event, detail) = match previous {
            DragState::Idle => return Ok(false),
            DragState::Dragging { module, .. } | DragState::Hovering { module, .. } => {
                (events::DRAGGING_STOP, EventDetail::Node { id: module.id })
            }
            DragState::Resizing(session) => {
                (events::RESIZING_CANCEL, EventDetail::Node { id: session.resizer })
            }
        };
        tracing::debug!("[cancel] grid={} {}", name, event);
        self.publish(event, name, detail);
        Ok(true)
    }

    /// Resolve the next pointer activity as a drop (when hovering) or a
    /// cancel (when merely dragging)
    pub fn arm_drop_detection(&mut self, name: &str) -> Result<(), StoreError> {
        let entry = self.entry_mut(name)?;
        match &mut entry.design.drag {
            DragState::Dragging { drop_detection, .. } | DragState::Hovering { drop_detection, .. } => {
                *drop_detection = true;
                Ok(())
            }
            other => Err(StoreError::invalid_transition(
                "arm drop detection",
                other.describe(),
            )),
        }
    }

    /// Feed pointer activity to an armed drop detection. Returns true if
    /// it resolved the drag.
    pub fn pointer_activity(&mut self, name: &str) -> Result<bool, StoreError> {
        let resolution = match &self.entry(name)?.design.drag {
            DragState::Hovering {
                drop_detection: true,
                ..
            } => Some(true),
            DragState::Dragging {
                drop_detection: true,
                ..
            } => Some(false),
            _ => None,
        };
        match resolution {
            Some(true) => self.drop(name).map(|_| true),
            Some(false) => self.cancel_dragging(name),
            None => Ok(false),
        }
    }

    /// Fire every hover-stay notification whose deadline has passed.
    /// Returns how many fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut due = Vec::new();
        for (name, entry) in self.grids.iter_mut() {
            let ready = matches!(&entry.pending_stay, Some(stay) if stay.deadline <= now);
            if !ready {
                continue;
            }
            if let Some(stay) = entry.pending_stay.take() {
                let still_there = matches!(
                    &entry.design.drag,
                    DragState::Hovering { placeholder, .. } if placeholder.id == stay.placeholder
                );
                if still_there {
                    due.push((name.clone(), stay.placeholder));
                }
            }
        }

        for (name, placeholder) in &due {
            self.publish(
                events::HOVERING_STAY,
                name,
                EventDetail::Node {
                    id: placeholder.clone(),
                },
            );
        }
        due.len()
    }

    /// Anchor a resize on the two sizable siblings around `resizer_id`
    pub fn start_resizing(&mut self, name: &str, resizer_id: &str) -> Result<(), StoreError> {
        self.require_design_mode(name)?;
        let entry = self.entry_mut(name)?;
        if !matches!(entry.design.drag, DragState::Idle) {
            return Err(StoreError::invalid_transition(
                "start resizing",
                entry.design.drag.describe(),
            ));
        }
        let doc = entry.current();
        let (before, after) = manipulator::resize_neighbours(doc, resizer_id)?;
        let size_of = |id: &str| doc.find_node(id).map(|n| n.relative_size()).unwrap_or(1.0);
        let session = ResizeSession {
            resizer: resizer_id.to_string(),
            before_size: size_of(&before),
            after_size: size_of(&after),
            before,
            after,
            delta: 0.0,
        };
        let (before, after) = session.sizes();
        entry.design.drag = DragState::Resizing(session);

        self.publish(
            events::RESIZING_START,
            name,
            EventDetail::Resize {
                resizer: resizer_id.to_string(),
                before,
                after,
            },
        );
        Ok(())
    }

    /// Update the transient offset (measured from the anchor). Returns the
    /// offset after clamping.
    pub fn resize_move(&mut self, name: &str, delta: f64) -> Result<f64, StoreError> {
        let min = self.config.min_relative_size;
        let entry = self.entry_mut(name)?;
        let session = match &mut entry.design.drag {
            DragState::Resizing(session) => session,
            other => return Err(StoreError::invalid_transition("resize", other.describe())),
        };
        session.delta = session.clamp(delta, min);
        let applied = session.delta;
        let resizer = session.resizer.clone();
        let (before, after) = session.sizes();

        self.publish(
            events::RESIZING_MOVE,
            name,
            EventDetail::Resize {
                resizer,
                before,
                after,
            },
        );
        Ok(applied)
    }

    /// Commit the current sizes as one undo step. A resize released
    /// without any movement ends silently; returns false then.
    pub fn stop_resizing(&mut self, name: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        let session = match &entry.design.drag {
            DragState::Resizing(session) => session.clone(),
            other => return Err(StoreError::invalid_transition("stop resizing", other.describe())),
        };
        if session.delta == 0.0 {
            entry.design.drag = DragState::Idle;
            tracing::debug!("[resize] grid={} released without movement", name);
            return Ok(false);
        }
        let (before, after) = session.sizes();
        let resized = manipulator::set_relative_sizes(
            &entry.working_copy(),
            &[before.clone(), after.clone()],
        )?;
        entry.push(resized, Some("resize".to_string()))?;
        entry.design.drag = DragState::Idle;

        tracing::info!(
            "[resize] grid={} {}={:.4} {}={:.4}",
            name,
            before.0,
            before.1,
            after.0,
            after.1
        );
        self.publish(
            events::RESIZING_STOP,
            name,
            EventDetail::Resize {
                resizer: session.resizer,
                before,
                after,
            },
        );
        Ok(true)
    }

    /// Discard a resize. Returns false if none was in progress.
    pub fn cancel_resizing(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.is_resizing(name)? {
            return Ok(false);
        }
        self.cancel_dragging(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    const ROW: &str = r#"
        <mainGrid name="G">
          <content>
            <row id="r">
              <cell component="M" id="c0"/>
              <cell component="M" id="c1"/>
            </row>
          </content>
        </mainGrid>"#;

    fn store() -> (Store, ManualClock) {
        let clock = ManualClock::new();
        let mut store = Store::new().with_clock(clock.clone());
        store.load_grid(ROW).unwrap();
        (store, clock)
    }

    fn first_of(store: &Store, pred: impl Fn(&gridkit_parser::Node) -> bool) -> String {
        store
            .document("G")
            .unwrap()
            .find_node("r")
            .unwrap()
            .children
            .iter()
            .find(|n| pred(n))
            .and_then(|n| n.id())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_dragging_requires_design_mode() {
        let (mut store, _) = store();
        assert!(matches!(
            store.start_dragging("G", "c0"),
            Err(StoreError::NotInDesignMode(_))
        ));
        store.enter_design_mode("G").unwrap();
        assert!(!store.enter_design_mode("G").unwrap());
        assert!(matches!(
            store.start_dragging("G", "r"),
            Err(StoreError::Edit(EditError::WrongKind { .. }))
        ));
        store.start_dragging("G", "c0").unwrap();
        assert!(store.is_dragging("G").unwrap());
        assert!(!store.is_hovering("G").unwrap());
    }

    #[test]
    fn test_hover_stay_fires_once_after_delay() {
        let (mut store, clock) = store();
        store.enter_design_mode("G").unwrap();
        store.start_dragging("G", "c0").unwrap();
        let slot = first_of(&store, |n| n.is_placeholder_cell());
        store.start_hovering("G", &slot).unwrap();

        clock.advance(Duration::from_millis(499));
        assert_eq!(store.poll_timers(), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(store.poll_timers(), 1);
        assert_eq!(store.poll_timers(), 0);
    }

    #[test]
    fn test_stop_hovering_cancels_stay() {
        let (mut store, clock) = store();
        store.enter_design_mode("G").unwrap();
        store.start_dragging("G", "c0").unwrap();
        let slot = first_of(&store, |n| n.is_placeholder_cell());
        store.start_hovering("G", &slot).unwrap();
        assert!(store.stop_hovering("G").unwrap());
        assert!(!store.stop_hovering("G").unwrap());

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.poll_timers(), 0);
        assert!(store.is_dragging("G").unwrap());
    }

    #[test]
    fn test_drop_detection() {
        let (mut store, _) = store();
        store.enter_design_mode("G").unwrap();

        // armed while dragging: pointer activity cancels
        store.start_dragging("G", "c0").unwrap();
        assert!(!store.pointer_activity("G").unwrap());
        store.arm_drop_detection("G").unwrap();
        assert!(store.pointer_activity("G").unwrap());
        assert!(!store.is_dragging("G").unwrap());

        // armed while hovering: pointer activity drops
        store.start_dragging("G", "c0").unwrap();
        store.arm_drop_detection("G").unwrap();
        let slot = first_of(&store, |n| n.is_placeholder_cell());
        store.start_hovering("G", &slot).unwrap();
        assert!(store.pointer_activity("G").unwrap());
        assert!(store.can_undo("G").unwrap());
    }

    #[test]
    fn test_resize_clamps_and_commits() {
        let (mut store, _) = store();
        store.enter_design_mode("G").unwrap();
        let resizer = first_of(&store, |n| n.is_resizer());
        store.start_resizing("G", &resizer).unwrap();
        assert!(store.is_resizing("G").unwrap());

        assert_eq!(store.resize_move("G", 0.5).unwrap(), 0.5);
        // c1 cannot shrink below 0.1
        assert!((store.resize_move("G", 5.0).unwrap() - 0.9).abs() < 1e-9);
        store.resize_move("G", 0.25).unwrap();
        assert!(store.stop_resizing("G").unwrap());

        let doc = store.document("G").unwrap();
        assert_eq!(doc.find_node("c0").unwrap().relative_size(), 1.25);
        assert_eq!(doc.find_node("c1").unwrap().relative_size(), 0.75);
        assert!(!store.is_resizing("G").unwrap());

        store.undo("G").unwrap();
        assert_eq!(
            store.document("G").unwrap().find_node("c0").unwrap().relative_size(),
            1.0
        );
    }

    #[test]
    fn test_release_without_movement_commits_nothing() {
        let (mut store, _) = store();
        store.enter_design_mode("G").unwrap();
        let resizer = first_of(&store, |n| n.is_resizer());
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        store.subscribe("grid.designMode.resizing.*", move |event| {
            sink.borrow_mut().push(event.name.clone());
            Ok(())
        });

        store.start_resizing("G", &resizer).unwrap();
        assert!(!store.stop_resizing("G").unwrap());

        assert!(!store.is_resizing("G").unwrap());
        assert!(!store.can_undo("G").unwrap());
        assert_eq!(store.document("G").unwrap().find_node("c0").unwrap().attribute("size"), None);
        assert_eq!(*seen.borrow(), vec![events::RESIZING_START.to_string()]);
    }

    #[test]
    fn test_cancel_resizing_discards() {
        let (mut store, _) = store();
        store.enter_design_mode("G").unwrap();
        let resizer = first_of(&store, |n| n.is_resizer());
        store.start_resizing("G", &resizer).unwrap();
        store.resize_move("G", 0.5).unwrap();
        assert!(store.cancel_resizing("G").unwrap());
        assert!(!store.cancel_resizing("G").unwrap());
        assert_eq!(
            store.document("G").unwrap().find_node("c0").unwrap().relative_size(),
            1.0
        );
        assert!(!store.can_undo("G").unwrap());
    }

    #[test]
    fn test_exit_clears_drag_and_timer() {
        let (mut store, clock) = store();
        store.enter_design_mode("G").unwrap();
        store.start_dragging("G", "c1").unwrap();
        let slot = first_of(&store, |n| n.is_placeholder_cell());
        store.start_hovering("G", &slot).unwrap();

        assert!(store.exit_design_mode("G").unwrap());
        assert!(!store.is_dragging("G").unwrap());
        assert!(!store.has_placeholders("G").unwrap());
        clock.advance(Duration::from_secs(1));
        assert_eq!(store.poll_timers(), 0);
    }
}
