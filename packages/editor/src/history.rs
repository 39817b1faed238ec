//! # Snapshot History
//!
//! Undo/redo over immutable document snapshots.
//!
//! ## Design
//!
//! - Every committed action pushes a new snapshot
//! - The cursor points at the active snapshot
//! - Pushing while the cursor is behind the end drops the redo tail
//! - The log is bounded; the oldest snapshots fall off the front
//! - Snapshots are shared (`Arc`), so undo and redo are cursor moves
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(doc);
//! history.push(next_doc, Some("move module".into()));
//!
//! history.undo(); // back to doc
//! history.redo(); // forward to next_doc
//! ```

use gridkit_parser::GridDocument;
use std::sync::Arc;

/// One snapshot plus the label of the action that produced it
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub document: Arc<GridDocument>,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl History {
    /// History with the default limit (100 undo levels)
    pub fn new(initial: GridDocument) -> Self {
        Self::with_max_levels(initial, 100)
    }

    pub fn with_max_levels(initial: GridDocument, max_levels: usize) -> Self {
        Self {
            entries: vec![HistoryEntry {
                document: Arc::new(initial),
                label: None,
            }],
            cursor: 0,
            max_levels,
        }
    }

    /// The active snapshot
    pub fn current(&self) -> &Arc<GridDocument> {
        &self.entries[self.cursor].document
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit a new snapshot after the cursor
    pub fn push(&mut self, document: GridDocument, label: Option<String>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            document: Arc::new(document),
            label,
        });

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.entries.len() > self.max_levels + 1 {
            let excess = self.entries.len() - (self.max_levels + 1);
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Replace the active snapshot without creating an undo step
    pub fn amend(&mut self, document: GridDocument) {
        self.entries[self.cursor].document = Arc::new(document);
    }

    /// Step back; `None` at the oldest snapshot
    pub fn undo(&mut self) -> Option<&Arc<GridDocument>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward; `None` at the newest snapshot
    pub fn redo(&mut self) -> Option<&Arc<GridDocument>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    /// Label of the step `undo` would revert
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            self.entries[self.cursor].label.as_deref()
        } else {
            None
        }
    }

    /// Label of the step `redo` would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.cursor + 1)
            .and_then(|entry| entry.label.as_deref())
    }

    /// Forget everything but the active snapshot
    pub fn clear(&mut self) {
        let current = self.entries.swap_remove(self.cursor);
        self.entries = vec![current];
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manipulator::{create_base_grid, insert_module};
    use gridkit_parser::Attributes;

    fn docs(n: usize) -> Vec<GridDocument> {
        let mut doc = create_base_grid("G").unwrap();
        let mut out = vec![doc.clone()];
        for i in 0..n {
            doc = insert_module(&doc, "G", &format!("M{}", i), Attributes::new())
                .unwrap()
                .0;
            out.push(doc.clone());
        }
        out
    }

    #[test]
    fn test_undo_redo_cursor() {
        let docs = docs(2);
        let mut history = History::new(docs[0].clone());
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.push(docs[1].clone(), Some("one".into()));
        history.push(docs[2].clone(), Some("two".into()));
        assert_eq!(history.undo_description(), Some("two"));

        assert_eq!(**history.undo().unwrap(), docs[1]);
        assert_eq!(history.redo_description(), Some("two"));
        assert_eq!(**history.undo().unwrap(), docs[0]);
        assert!(history.undo().is_none());

        assert_eq!(**history.redo().unwrap(), docs[1]);
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 1);
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let docs = docs(3);
        let mut history = History::new(docs[0].clone());
        history.push(docs[1].clone(), None);
        history.push(docs[2].clone(), None);
        history.undo();
        history.push(docs[3].clone(), None);

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(**history.current(), docs[3]);
    }

    #[test]
    fn test_max_levels_drops_oldest() {
        let docs = docs(4);
        let mut history = History::with_max_levels(docs[0].clone(), 2);
        for doc in &docs[1..] {
            history.push(doc.clone(), None);
        }
        assert_eq!(history.undo_levels(), 2);
        history.undo();
        history.undo();
        assert_eq!(**history.current(), docs[2]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_amend_and_clear() {
        let docs = docs(2);
        let mut history = History::new(docs[0].clone());
        history.push(docs[1].clone(), None);
        history.amend(docs[2].clone());
        assert_eq!(history.len(), 2);
        assert_eq!(**history.current(), docs[2]);

        history.clear();
        assert_eq!(history.len(), 1);
        assert_eq!(**history.current(), docs[2]);
    }
}
