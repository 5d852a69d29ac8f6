//! Structural mutation helpers.
//!
//! Pure transforms over a [`FormDefinition`](crate::model::FormDefinition):
//! every helper takes the definition by value and returns the new value, so a
//! pipeline that stops half way never leaves a shared, half-edited document
//! behind. No I/O happens here; the repository layer loads, calls one of these,
//! validates and writes back.

pub mod components;
pub mod conditions;
pub mod lists;
pub mod pages;
pub mod sections;

pub use components::*;
pub use conditions::*;
pub use lists::*;
pub use pages::*;
pub use sections::*;

use std::collections::HashMap;

use uuid::Uuid;

/// Insert `item` at `position` with slice semantics: negative counts from the
/// end (`-1` is before the last element), out-of-range clamps, `None` appends.
pub(crate) fn insert_at<T>(items: &mut Vec<T>, item: T, position: Option<i64>) {
    let len = items.len() as i64;
    let index = match position {
        None => len,
        Some(p) if p < 0 => (len + p).max(0),
        Some(p) => p.min(len),
    };
    items.insert(index as usize, item);
}

/// Stable sort of `items` by each id's index in `order`. Items whose id is
/// absent from `order` (or that have no id) go last, keeping their relative
/// order. A repeated id in `order` ranks by its first occurrence.
pub(crate) fn reorder_by_ids<T>(
    mut items: Vec<T>,
    order: &[Uuid],
    id_of: impl Fn(&T) -> Option<Uuid>,
) -> Vec<T> {
    let mut rank: HashMap<Uuid, usize> = HashMap::with_capacity(order.len());
    for (i, id) in order.iter().enumerate() {
        rank.entry(*id).or_insert(i);
    }
    items.sort_by_key(|item| {
        id_of(item)
            .and_then(|id| rank.get(&id).copied())
            .unwrap_or(usize::MAX)
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_at_positions() {
        let mut v = vec![1, 2, 3];
        insert_at(&mut v, 9, Some(-1));
        assert_eq!(v, vec![1, 2, 9, 3]);

        let mut v = vec![1, 2, 3];
        insert_at(&mut v, 9, Some(-2));
        assert_eq!(v, vec![1, 9, 2, 3]);

        let mut v = vec![1, 2, 3];
        insert_at(&mut v, 9, Some(-10));
        assert_eq!(v, vec![9, 1, 2, 3]);

        let mut v = vec![1, 2, 3];
        insert_at(&mut v, 9, Some(10));
        assert_eq!(v, vec![1, 2, 3, 9]);

        let mut v = vec![1, 2, 3];
        insert_at(&mut v, 9, None);
        assert_eq!(v, vec![1, 2, 3, 9]);

        let mut v: Vec<i32> = vec![];
        insert_at(&mut v, 9, Some(-1));
        assert_eq!(v, vec![9]);
    }

    #[test]
    fn reorder_puts_unlisted_last_in_original_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let items = ids.clone();
        let out = reorder_by_ids(items, &[ids[2], ids[0]], |id| Some(*id));
        assert_eq!(out, vec![ids[2], ids[0], ids[1], ids[3]]);
    }

    #[test]
    fn reorder_first_occurrence_wins() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let out = reorder_by_ids(vec![a, b], &[b, a, b], |id| Some(*id));
        assert_eq!(out, vec![b, a]);
    }
}
