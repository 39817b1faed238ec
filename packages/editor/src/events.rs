//! Hierarchical publish/subscribe channel.
//!
//! Event names are `.`-separated (`grid.designMode.dragging.start`).
//! Subscription patterns use the same segments plus two wildcards: `*`
//! matches exactly one segment, `**` matches any number of segments
//! (including none). Handlers run synchronously in subscription order.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

pub const GRID_ADD: &str = "grid.add";
pub const GRID_REMOVE: &str = "grid.remove";
pub const DESIGN_MODE_ENTER: &str = "grid.designMode.enter";
pub const DESIGN_MODE_EXIT: &str = "grid.designMode.exit";
pub const DRAGGING_START: &str = "grid.designMode.dragging.start";
pub const DRAGGING_STOP: &str = "grid.designMode.dragging.stop";
pub const HOVERING_START: &str = "grid.designMode.hovering.start";
pub const HOVERING_STOP: &str = "grid.designMode.hovering.stop";
pub const HOVERING_STAY: &str = "grid.designMode.hovering.stay";
pub const DROP: &str = "grid.designMode.drop";
pub const RESIZING_START: &str = "grid.designMode.resizing.start";
pub const RESIZING_MOVE: &str = "grid.designMode.resizing.move";
pub const RESIZING_STOP: &str = "grid.designMode.resizing.stop";
pub const RESIZING_CANCEL: &str = "grid.designMode.resizing.cancel";
pub const HISTORY_UNDO: &str = "grid.history.undo";
pub const HISTORY_REDO: &str = "grid.history.redo";
pub const BATCH: &str = "grid.batch";
pub const FOCUS_CHANGE: &str = "grid.focus.change";

/// Payload attached to an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventDetail {
    None,
    Node {
        id: String,
    },
    Module {
        id: String,
        component: String,
    },
    Move {
        module: String,
        placeholder: String,
    },
    Hover {
        module: String,
        placeholder: String,
    },
    Resize {
        resizer: String,
        before: (String, f64),
        after: (String, f64),
    },
    Focus {
        id: String,
        index: Option<usize>,
    },
    History {
        cursor: usize,
        label: Option<String>,
    },
    Batch {
        count: usize,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    /// Name of the grid document the event concerns
    pub document: String,
    pub detail: EventDetail,
}

impl Event {
    pub fn new(name: &str, document: &str, detail: EventDetail) -> Self {
        Self {
            name: name.to_string(),
            document: document.to_string(),
            detail,
        }
    }

    /// High-frequency notifications that carry no committed change
    pub fn is_transient(&self) -> bool {
        self.name == RESIZING_MOVE
    }
}

pub type Handler = Box<dyn FnMut(&Event) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    pattern: Vec<String>,
    handler: Handler,
}

#[derive(Default)]
pub struct EventChannel {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> anyhow::Result<()> + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            pattern: pattern.split('.').map(str::to_string).collect(),
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Deliver to every matching subscriber. Failing or panicking
    /// handlers are logged; the rest still run.
    pub fn publish(&mut self, event: &Event) {
        debug!(event = %event.name, document = %event.document, "publish");
        let segments: Vec<&str> = event.name.split('.').collect();
        for subscription in &mut self.subscriptions {
            if !pattern_matches(&subscription.pattern, &segments) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| (subscription.handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(event = %event.name, error = %err, "event handler failed");
                }
                Err(_) => {
                    warn!(event = %event.name, "event handler panicked");
                }
            }
        }
    }
}

/// Segment-wise glob match with `*` and `**`
pub fn pattern_matches<S: AsRef<str>>(pattern: &[S], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((head, rest)) if head.as_ref() == "**" => {
            (0..=name.len()).any(|skip| pattern_matches(rest, &name[skip..]))
        }
        Some((head, rest)) => match name.split_first() {
            Some((segment, name_rest)) => {
                (head.as_ref() == "*" || head.as_ref() == *segment)
                    && pattern_matches(rest, name_rest)
            }
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn matches(pattern: &str, name: &str) -> bool {
        let pattern: Vec<&str> = pattern.split('.').collect();
        let name: Vec<&str> = name.split('.').collect();
        pattern_matches(&pattern, &name)
    }

    #[test]
    fn test_pattern_matching() {
        assert!(matches("grid.add", "grid.add"));
        assert!(!matches("grid.add", "grid.remove"));
        assert!(matches("grid.*", "grid.add"));
        assert!(!matches("grid.*", "grid.designMode.enter"));
        assert!(matches("grid.**", "grid.designMode.dragging.start"));
        assert!(matches("grid.designMode.**", "grid.designMode"));
        assert!(matches("**.start", "grid.designMode.hovering.start"));
        assert!(matches("**", "anything.at.all"));
        assert!(!matches("grid.designMode.*.start", "grid.designMode.enter"));
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut channel = EventChannel::new();
        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            channel.subscribe("grid.**", move |event| {
                seen.borrow_mut().push(format!("{}:{}", tag, event.name));
                Ok(())
            });
        }
        channel.publish(&Event::new(GRID_ADD, "G", EventDetail::None));
        assert_eq!(*seen.borrow(), vec!["first:grid.add", "second:grid.add"]);
    }

    #[test]
    fn test_failing_handlers_are_isolated() {
        let count = Rc::new(RefCell::new(0));
        let mut channel = EventChannel::new();
        channel.subscribe("**", |_| anyhow::bail!("broken"));
        channel.subscribe("**", |_| panic!("worse"));
        let c = Rc::clone(&count);
        channel.subscribe("**", move |_| {
            *c.borrow_mut() += 1;
            Ok(())
        });

        channel.publish(&Event::new(DROP, "G", EventDetail::None));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut channel = EventChannel::new();
        let c = Rc::clone(&count);
        let id = channel.subscribe("grid.add", move |_| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        channel.publish(&Event::new(GRID_ADD, "G", EventDetail::None));
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.publish(&Event::new(GRID_ADD, "G", EventDetail::None));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_transient_events() {
        assert!(Event::new(RESIZING_MOVE, "G", EventDetail::None).is_transient());
        assert!(!Event::new(RESIZING_STOP, "G", EventDetail::None).is_transient());
    }
}
