//! Ordered, stacking-aware inventory.
//!
//! Entries are unique by item id unless the item is stackable, in which case
//! quantities combine up to the item's `max_stack` and overflow spills into a
//! new stack. Authored order is preserved; sorting is an explicit operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{EquipSlot, Item};
use crate::error::DomainError;
use crate::ids::ItemId;

/// Default number of stacks an inventory can hold.
pub const DEFAULT_INVENTORY_SLOTS: usize = 50;

/// A held quantity of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub item: Item,
    pub quantity: u32,
    #[serde(default)]
    pub equipped: bool,
    pub acquired_at: DateTime<Utc>,
}

/// Keys the inventory can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InventorySort {
    Name,
    Kind,
    Value,
    Rarity,
}

/// The player's inventory: an ordered list of item stacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    items: Vec<ItemStack>,
    #[serde(default = "default_slots")]
    max_slots: usize,
}

fn default_slots() -> usize {
    DEFAULT_INVENTORY_SLOTS
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            max_slots: DEFAULT_INVENTORY_SLOTS,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_slots: usize) -> Self {
        Self {
            items: Vec::new(),
            max_slots,
        }
    }

    /// Add `quantity` of `item`, combining into existing stacks when the item
    /// is stackable. Overflow beyond `max_stack` opens new stacks. Fails with
    /// `InventoryFull` if a needed new stack would exceed capacity; quantities
    /// already merged into existing stacks are kept.
    pub fn add(
        &mut self,
        item: Item,
        quantity: u32,
        acquired_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("cannot add zero items"));
        }

        let mut remaining = quantity;

        if item.stackable {
            for stack in self
                .items
                .iter_mut()
                .filter(|s| s.item.id == item.id && s.quantity < s.item.max_stack)
            {
                let room = stack.item.max_stack - stack.quantity;
                let moved = remaining.min(room);
                stack.quantity += moved;
                remaining -= moved;
                if remaining == 0 {
                    return Ok(());
                }
            }
        }

        while remaining > 0 {
            if self.items.len() >= self.max_slots {
                return Err(DomainError::inventory_full(self.items.len(), self.max_slots));
            }
            let stack_size = if item.stackable {
                remaining.min(item.max_stack)
            } else {
                // Non-stackable items always occupy one slot each.
                1
            };
            self.items.push(ItemStack {
                item: item.clone(),
                quantity: stack_size,
                equipped: false,
                acquired_at,
            });
            remaining -= stack_size;
        }

        Ok(())
    }

    /// Remove `quantity` of the item, draining stacks front to back.
    /// Fails without mutating if fewer than `quantity` are held.
    pub fn remove(&mut self, item_id: &ItemId, quantity: u32) -> Result<(), DomainError> {
        if self.count(item_id) < quantity {
            return Err(DomainError::constraint(format!(
                "not enough '{}' to remove {}",
                item_id, quantity
            )));
        }

        let mut remaining = quantity;
        self.items.retain_mut(|stack| {
            if remaining == 0 || stack.item.id != *item_id {
                return true;
            }
            let taken = remaining.min(stack.quantity);
            stack.quantity -= taken;
            remaining -= taken;
            stack.quantity > 0
        });

        Ok(())
    }

    /// Total quantity held across all stacks of the item.
    pub fn count(&self, item_id: &ItemId) -> u32 {
        self.items
            .iter()
            .filter(|s| s.item.id == *item_id)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn has(&self, item_id: &ItemId) -> bool {
        self.count(item_id) > 0
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&ItemStack> {
        self.items.iter().find(|s| s.item.id == *item_id)
    }

    pub fn get_mut(&mut self, item_id: &ItemId) -> Option<&mut ItemStack> {
        self.items.iter_mut().find(|s| s.item.id == *item_id)
    }

    /// Currently equipped stack in `slot`, if any.
    pub fn equipped_in(&self, slot: EquipSlot) -> Option<&ItemStack> {
        self.items
            .iter()
            .find(|s| s.equipped && s.item.slot == Some(slot))
    }

    /// Mark the stack equipped, unequipping whatever held the slot before.
    /// Returns the id of the displaced item, if there was one.
    pub fn equip(&mut self, item_id: &ItemId) -> Result<Option<ItemId>, DomainError> {
        let slot = self
            .get(item_id)
            .ok_or_else(|| DomainError::not_found("Item", item_id.to_string()))?
            .item
            .slot
            .ok_or_else(|| {
                DomainError::constraint(format!("'{}' is not equippable", item_id))
            })?;

        let displaced = self
            .items
            .iter_mut()
            .find(|s| s.equipped && s.item.slot == Some(slot) && s.item.id != *item_id)
            .map(|s| {
                s.equipped = false;
                s.item.id.clone()
            });

        if let Some(stack) = self.get_mut(item_id) {
            stack.equipped = true;
        }
        Ok(displaced)
    }

    pub fn unequip(&mut self, item_id: &ItemId) {
        if let Some(stack) = self.get_mut(item_id) {
            stack.equipped = false;
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.items
            .iter()
            .map(|s| s.item.weight * f64::from(s.quantity))
            .sum()
    }

    pub fn total_value(&self) -> i64 {
        self.items
            .iter()
            .map(|s| s.item.value * i64::from(s.quantity))
            .sum()
    }

    pub fn sort_by(&mut self, key: InventorySort) {
        match key {
            InventorySort::Name => self.items.sort_by(|a, b| a.item.name.cmp(&b.item.name)),
            InventorySort::Kind => self
                .items
                .sort_by_key(|s| (s.item.kind.to_string(), s.item.name.clone())),
            InventorySort::Value => self.items.sort_by(|a, b| b.item.value.cmp(&a.item.value)),
            InventorySort::Rarity => self
                .items
                .sort_by(|a, b| b.item.rarity.rank().cmp(&a.item.rarity.rank())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemStack> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ItemKind, Rarity};

    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn herb() -> Item {
        Item::new("herb", "Moonpetal Herb", ItemKind::Misc).stackable(10)
    }

    fn sword() -> Item {
        Item::new("sword", "Iron Sword", ItemKind::Weapon).with_slot(EquipSlot::Weapon)
    }

    #[test]
    fn stackable_add_combines_quantities() {
        let mut inv = Inventory::new();
        inv.add(herb(), 4, now()).expect("add");
        inv.add(herb(), 3, now()).expect("add");

        assert_eq!(inv.len(), 1);
        assert_eq!(inv.count(&"herb".into()), 7);
    }

    #[test]
    fn stackable_overflow_spills_into_new_stack() {
        let mut inv = Inventory::new();
        inv.add(herb(), 8, now()).expect("add");
        inv.add(herb(), 5, now()).expect("add");

        assert_eq!(inv.len(), 2);
        assert_eq!(inv.count(&"herb".into()), 13);
        let quantities: Vec<_> = inv.iter().map(|s| s.quantity).collect();
        assert_eq!(quantities, vec![10, 3]);
    }

    #[test]
    fn non_stackable_same_id_creates_separate_entries() {
        let mut inv = Inventory::new();
        inv.add(sword(), 1, now()).expect("add");
        inv.add(sword(), 1, now()).expect("add");

        assert_eq!(inv.len(), 2);
        assert_eq!(inv.count(&"sword".into()), 2);
    }

    #[test]
    fn add_fails_when_slots_exhausted() {
        let mut inv = Inventory::with_capacity(1);
        inv.add(sword(), 1, now()).expect("add");
        let err = inv.add(sword(), 1, now()).expect_err("should be full");
        assert!(matches!(err, DomainError::InventoryFull { .. }));
    }

    #[test]
    fn remove_decrements_then_deletes() {
        let mut inv = Inventory::new();
        inv.add(herb(), 6, now()).expect("add");

        inv.remove(&"herb".into(), 4).expect("remove");
        assert_eq!(inv.count(&"herb".into()), 2);

        inv.remove(&"herb".into(), 2).expect("remove");
        assert!(inv.is_empty());
    }

    #[test]
    fn remove_more_than_held_fails_without_mutation() {
        let mut inv = Inventory::new();
        inv.add(herb(), 2, now()).expect("add");

        assert!(inv.remove(&"herb".into(), 3).is_err());
        assert_eq!(inv.count(&"herb".into()), 2);
    }

    #[test]
    fn equip_swaps_slot_occupant() {
        let mut inv = Inventory::new();
        inv.add(sword(), 1, now()).expect("add");
        let axe = Item::new("axe", "Hand Axe", ItemKind::Weapon).with_slot(EquipSlot::Weapon);
        inv.add(axe, 1, now()).expect("add");

        assert_eq!(inv.equip(&"sword".into()).expect("equip"), None);
        let displaced = inv.equip(&"axe".into()).expect("equip");
        assert_eq!(displaced, Some("sword".into()));
        assert_eq!(
            inv.equipped_in(EquipSlot::Weapon).map(|s| s.item.id.clone()),
            Some("axe".into())
        );
    }

    #[test]
    fn aggregates_weight_and_value() {
        let mut inv = Inventory::new();
        let mut item = herb();
        item.weight = 0.5;
        item.value = 3;
        inv.add(item, 4, now()).expect("add");

        assert!((inv.total_weight() - 2.0).abs() < f64::EPSILON);
        assert_eq!(inv.total_value(), 12);
    }

    #[test]
    fn sort_by_rarity_descends() {
        let mut inv = Inventory::new();
        inv.add(herb(), 1, now()).expect("add");
        let relic = Item::new("relic", "Sun Relic", ItemKind::Misc).with_rarity(Rarity::Legendary);
        inv.add(relic, 1, now()).expect("add");

        inv.sort_by(InventorySort::Rarity);
        assert_eq!(inv.iter().next().map(|s| s.item.id.clone()), Some("relic".into()));
    }
}
