//! Ordered-list reordering: move the element at one index to another,
//! shifting everything in between. This is the gesture-library-independent
//! core of drag-to-reorder over work experiences, educations, projects, and
//! skills.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MoveError {
    #[error("index {index} out of bounds for list of length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Moves `items[from]` so it ends up at index `to`; elements in between shift
/// by one. `from == to` is a no-op.
pub fn move_entry<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), MoveError> {
    let len = items.len();
    if from >= len {
        return Err(MoveError::OutOfBounds { index: from, len });
    }
    if to >= len {
        return Err(MoveError::OutOfBounds { index: to, len });
    }
    if from == to {
        return Ok(());
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_forward_shifts_intermediate_elements() {
        let mut items = vec!["a", "b", "c", "d"];
        move_entry(&mut items, 0, 2).unwrap();
        assert_eq!(items, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_backward_shifts_intermediate_elements() {
        let mut items = vec!["a", "b", "c", "d"];
        move_entry(&mut items, 3, 1).unwrap();
        assert_eq!(items, vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_move_to_same_index_is_noop() {
        let mut items = vec![1, 2, 3];
        move_entry(&mut items, 1, 1).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_bounds_source_is_rejected() {
        let mut items = vec![1, 2];
        assert_eq!(
            move_entry(&mut items, 2, 0),
            Err(MoveError::OutOfBounds { index: 2, len: 2 })
        );
        // list untouched on error
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_out_of_bounds_target_is_rejected() {
        let mut items = vec![1, 2];
        assert_eq!(
            move_entry(&mut items, 0, 5),
            Err(MoveError::OutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_empty_list_rejects_any_move() {
        let mut items: Vec<u8> = Vec::new();
        assert!(move_entry(&mut items, 0, 0).is_err());
    }
}
