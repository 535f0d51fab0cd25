//! Bounded, ordered inventory.
//!
//! Items are stored in pickup order. Selection semantics mirror the
//! original character: the first pickup auto-selects; a throw targets
//! `max(selected, 0)` and decrements the selection afterward unless it is
//! already at the front.

use anyhow::bail;
use tracing::warn;

use crate::object::ObjectId;

pub const DEFAULT_CAPACITY: usize = 5;

/// One-way UI notifications. A missing sink is tolerated everywhere:
/// implementations log and skip, never fail.
pub trait InventoryUi {
    fn notify_added(&mut self, item: ObjectId);
    fn notify_removed_at(&mut self, index: usize);
    fn notify_cleared(&mut self);
}

/// UI sink for headless runs; logs at debug and drops the notification.
#[derive(Default)]
pub struct NullUi;

impl InventoryUi for NullUi {
    fn notify_added(&mut self, item: ObjectId) {
        tracing::debug!(?item, "inventory add (no UI attached)");
    }

    fn notify_removed_at(&mut self, index: usize) {
        tracing::debug!(index, "inventory remove (no UI attached)");
    }

    fn notify_cleared(&mut self) {
        tracing::debug!("inventory clear (no UI attached)");
    }
}

#[derive(Debug, Clone)]
pub struct Inventory {
    items: Vec<ObjectId>,
    capacity: usize,
    /// Index of the selected item, or -1 when nothing is held.
    selected: isize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            selected: -1,
        }
    }

    pub fn items(&self) -> &[ObjectId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn selected(&self) -> isize {
        self.selected
    }

    /// Appends an item, auto-selecting it if nothing was selected.
    /// Returns the insertion index.
    pub fn push(&mut self, item: ObjectId) -> anyhow::Result<usize> {
        if self.is_full() {
            warn!(?item, capacity = self.capacity, "inventory full, pickup skipped");
            bail!("inventory at capacity ({})", self.capacity);
        }
        self.items.push(item);
        let index = self.items.len() - 1;
        if self.selected == -1 {
            self.selected = index as isize;
        }
        Ok(index)
    }

    /// The item the selection currently points at (throw target).
    pub fn selected_item(&self) -> Option<ObjectId> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(self.selected.max(0) as usize).copied()
    }

    /// Removes `id` wherever it sits, returning the index it was removed
    /// from. The selection decrements unless already at the front;
    /// emptying the inventory clears it back to -1.
    pub fn remove(&mut self, id: ObjectId) -> Option<usize> {
        let index = self.items.iter().position(|item| *item == id)?;
        self.items.remove(index);

        if self.items.is_empty() {
            self.selected = -1;
        } else if self.selected > 0 {
            self.selected -= 1;
        }

        Some(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ObjectId {
        ObjectId(n)
    }

    #[test]
    fn first_pickup_auto_selects() {
        let mut inv = Inventory::new(5);
        inv.push(id(1)).unwrap();
        assert_eq!(inv.selected(), 0);
        inv.push(id(2)).unwrap();
        // Later pickups do not move the selection.
        assert_eq!(inv.selected(), 0);
    }

    #[test]
    fn capacity_overflow_is_a_no_op() {
        let mut inv = Inventory::new(5);
        for n in 1..=5 {
            inv.push(id(n)).unwrap();
        }
        assert!(inv.push(id(6)).is_err());
        assert_eq!(inv.len(), 5);
        assert_eq!(inv.items(), &[id(1), id(2), id(3), id(4), id(5)]);
        assert_eq!(inv.selected(), 0);
    }

    #[test]
    fn removal_at_front_keeps_selection_clamped() {
        let mut inv = Inventory::new(5);
        inv.push(id(1)).unwrap();
        inv.push(id(2)).unwrap();
        assert_eq!(inv.selected(), 0);
        assert_eq!(inv.selected_item(), Some(id(1)));

        let index = inv.remove(id(1)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(inv.items(), &[id(2)]);
        assert_eq!(inv.selected(), 0);
        assert_eq!(inv.selected_item(), Some(id(2)));
    }

    #[test]
    fn emptying_resets_selection() {
        let mut inv = Inventory::new(5);
        inv.push(id(1)).unwrap();
        assert_eq!(inv.remove(id(1)), Some(0));
        assert!(inv.is_empty());
        assert_eq!(inv.selected(), -1);
        assert_eq!(inv.selected_item(), None);
    }

    #[test]
    fn removing_unknown_item_is_a_noop() {
        let mut inv = Inventory::new(5);
        inv.push(id(1)).unwrap();
        assert_eq!(inv.remove(id(9)), None);
        assert_eq!(inv.items(), &[id(1)]);
        assert_eq!(inv.selected(), 0);
    }
}
