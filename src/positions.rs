//! The position sequencer.
//!
//! Card positions within a column must form the dense sequence `0..n-1`.
//! Mutations write a raw requested position first (which may be out of range
//! or collide with an existing card) and then call [`renumber_column`], which
//! resolves everything through the deterministic `(position, id)` order.

use uuid::Uuid;

use crate::store::{KanbanStore, StoreResult};

/// Reassigns dense positions to the cards of `column_id` in their current
/// `(position, id)` order. Cards already at their index are left untouched,
/// so a renumber of an already-dense column writes nothing.
///
/// Returns the number of cards written.
pub fn renumber_column(store: &dyn KanbanStore, column_id: Uuid) -> StoreResult<usize> {
    let cards = store.column_cards_ordered(column_id)?;
    let mut writes = 0;
    for (index, card) in cards.iter().enumerate() {
        let index = index as i32;
        if card.position != index {
            store.set_card_position(card.id, index)?;
            writes += 1;
        }
    }
    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewBoard, NewCard, NewColumn};

    fn column_with_positions(store: &MemoryStore, positions: &[i32]) -> Uuid {
        let board = store
            .insert_board(NewBoard {
                id: Uuid::new_v4(),
                name: "Board".into(),
                description: String::new(),
            })
            .unwrap();
        let column = store
            .insert_column(NewColumn {
                id: Uuid::new_v4(),
                board_id: board.id,
                name: "Column".into(),
                position: 0,
                color: "#2a92bf".into(),
            })
            .unwrap();
        for &position in positions {
            store
                .insert_card(NewCard {
                    id: Uuid::new_v4(),
                    column_id: column.id,
                    title: format!("card at {position}"),
                    description: String::new(),
                    position,
                    created_by: None,
                })
                .unwrap();
        }
        column.id
    }

    fn positions(store: &MemoryStore, column_id: Uuid) -> Vec<i32> {
        store
            .column_cards_ordered(column_id)
            .unwrap()
            .iter()
            .map(|c| c.position)
            .collect()
    }

    #[test]
    fn compacts_gaps_and_duplicates() {
        let store = MemoryStore::new();
        let column_id = column_with_positions(&store, &[5, 5, 9, 2]);

        let writes = renumber_column(&store, column_id).unwrap();

        assert_eq!(positions(&store, column_id), vec![0, 1, 2, 3]);
        assert_eq!(writes, 4);
    }

    #[test]
    fn dense_column_is_untouched() {
        let store = MemoryStore::new();
        let column_id = column_with_positions(&store, &[0, 1, 2]);

        assert_eq!(renumber_column(&store, column_id).unwrap(), 0);
        assert_eq!(positions(&store, column_id), vec![0, 1, 2]);
    }

    #[test]
    fn second_call_writes_nothing() {
        let store = MemoryStore::new();
        let column_id = column_with_positions(&store, &[3, 3, 7]);

        assert!(renumber_column(&store, column_id).unwrap() > 0);
        assert_eq!(renumber_column(&store, column_id).unwrap(), 0);
    }

    #[test]
    fn colliding_positions_rank_by_id() {
        let store = MemoryStore::new();
        let column_id = column_with_positions(&store, &[1, 1, 1]);

        let mut expected: Vec<Uuid> = store
            .column_cards_ordered(column_id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        expected.sort();

        renumber_column(&store, column_id).unwrap();

        let ranked: Vec<Uuid> = store
            .column_cards_ordered(column_id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ranked, expected);
    }

    #[test]
    fn empty_column_is_a_no_op() {
        let store = MemoryStore::new();
        let column_id = column_with_positions(&store, &[]);

        assert_eq!(renumber_column(&store, column_id).unwrap(), 0);
    }
}
