//! Keyboard/swipe focus movement across module cells.
//!
//! Modules are laid out as a matrix, one row per grid row (modules of a
//! nested grid join the row holding it). Left/right move within a row,
//! up/down move to the nearest column of the adjacent row. Moving past an
//! edge does nothing.

use crate::errors::StoreError;
use crate::events::{self, EventDetail};
use crate::manipulator;
use crate::store::Store;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

/// Position to move to from `(row, column)`, or `None` at an edge
pub fn step(matrix: &[Vec<String>], row: usize, column: usize, direction: Direction) -> Option<(usize, usize)> {
    match direction {
        Direction::Left => column.checked_sub(1).map(|c| (row, c)),
        Direction::Right => (column + 1 < matrix.get(row)?.len()).then(|| (row, column + 1)),
        Direction::Top => {
            let above = row.checked_sub(1)?;
            let len = matrix.get(above)?.len();
            Some((above, column.min(len.checked_sub(1)?)))
        }
        Direction::Bottom => {
            let len = matrix.get(row + 1)?.len();
            Some((row + 1, column.min(len.checked_sub(1)?)))
        }
    }
}

fn locate(matrix: &[Vec<String>], id: &str) -> Option<(usize, usize)> {
    matrix.iter().enumerate().find_map(|(r, row)| {
        row.iter().position(|cell| cell == id).map(|c| (r, c))
    })
}

impl Store {
    /// Focus a module cell directly
    pub fn focus_module(&mut self, name: &str, module_id: &str) -> Result<bool, StoreError> {
        let entry = self.entry_mut(name)?;
        if entry.current().focused.as_deref() == Some(module_id) {
            return Ok(false);
        }
        let focused = manipulator::set_focus(&entry.working_copy(), module_id)?;
        let index = manipulator::compute_focus_index(&focused, &focused.name)?;
        entry.amend(focused);

        tracing::debug!("[focus] grid={} module={}", name, module_id);
        self.publish(
            events::FOCUS_CHANGE,
            name,
            EventDetail::Focus {
                id: module_id.to_string(),
                index,
            },
        );
        Ok(true)
    }

    /// Move focus one step. With nothing focused the first module takes
    /// focus. Returns false when focus did not change.
    pub fn move_focus(&mut self, name: &str, direction: Direction) -> Result<bool, StoreError> {
        let doc = self.document(name)?;
        let matrix = manipulator::module_matrix(doc, &doc.name)?;

        let target = match doc.focused.as_deref().and_then(|id| locate(&matrix, id)) {
            Some((row, column)) => {
                step(&matrix, row, column, direction).map(|(r, c)| matrix[r][c].clone())
            }
            None => matrix.first().and_then(|row| row.first()).cloned(),
        };

        match target {
            Some(id) => self.focus_module(name, &id),
            None => Ok(false),
        }
    }

    pub fn focus_left_module_cell(&mut self, name: &str) -> Result<bool, StoreError> {
        self.move_focus(name, Direction::Left)
    }

    pub fn focus_right_module_cell(&mut self, name: &str) -> Result<bool, StoreError> {
        self.move_focus(name, Direction::Right)
    }

    pub fn focus_top_module_cell(&mut self, name: &str) -> Result<bool, StoreError> {
        self.move_focus(name, Direction::Top)
    }

    pub fn focus_bottom_module_cell(&mut self, name: &str) -> Result<bool, StoreError> {
        self.move_focus(name, Direction::Bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Vec<Vec<String>> {
        vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into()],
        ]
    }

    #[test]
    fn test_step_within_and_across_rows() {
        let m = matrix();
        assert_eq!(step(&m, 0, 1, Direction::Left), Some((0, 0)));
        assert_eq!(step(&m, 0, 1, Direction::Right), Some((0, 2)));
        assert_eq!(step(&m, 0, 2, Direction::Bottom), Some((1, 0)));
        assert_eq!(step(&m, 1, 0, Direction::Top), Some((0, 0)));
    }

    #[test]
    fn test_step_stops_at_edges() {
        let m = matrix();
        assert_eq!(step(&m, 0, 0, Direction::Left), None);
        assert_eq!(step(&m, 0, 2, Direction::Right), None);
        assert_eq!(step(&m, 0, 0, Direction::Top), None);
        assert_eq!(step(&m, 1, 0, Direction::Bottom), None);
    }

    #[test]
    fn test_store_focus_navigation() {
        let mut store = Store::new();
        store
            .load_grid(
                r#"<mainGrid name="G"><content>
                     <row><cell component="A" id="a"/><cell component="B" id="b"/></row>
                     <resizer/>
                     <row><cell component="C" id="c"/></row>
                   </content></mainGrid>"#,
            )
            .unwrap();

        assert!(store.focus_right_module_cell("G").unwrap());
        assert_eq!(store.focused_module("G").unwrap(), Some("a"));
        assert!(store.focus_right_module_cell("G").unwrap());
        assert_eq!(store.focused_module("G").unwrap(), Some("b"));
        assert!(!store.focus_right_module_cell("G").unwrap());
        assert!(store.focus_bottom_module_cell("G").unwrap());
        assert_eq!(store.focused_module("G").unwrap(), Some("c"));
        assert_eq!(store.focused_module_cell_index("G").unwrap(), Some(2));

        // focus changes never create undo steps
        assert!(!store.can_undo("G").unwrap());
    }
}
