//! Inventory operations above the raw container: add/remove, sorting,
//! aggregation, equipping, and the per-kind "use" dispatch with narrated
//! outcomes.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use taleweave_domain::{
    DomainError, GameState, InventorySort, Item, ItemId, ItemKind, LevelChange,
};

use crate::application::ports::ClockPort;
use crate::events::{GameEvent, GameEventBus};

/// Errors from inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("item '{0}' is not carried")]
    NotCarried(ItemId),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Narrated result of using an item.
#[derive(Debug, Clone, PartialEq)]
pub struct UseOutcome {
    pub item_id: ItemId,
    pub narration: String,
    /// Whether one unit was consumed by the use.
    pub consumed: bool,
}

/// Stacking-aware inventory operations over game state.
pub struct InventoryManager {
    clock: Arc<dyn ClockPort>,
    events: GameEventBus,
}

impl InventoryManager {
    pub fn new(clock: Arc<dyn ClockPort>, events: GameEventBus) -> Self {
        Self { clock, events }
    }

    pub fn add(
        &self,
        state: &mut GameState,
        item: Item,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        state
            .inventory
            .add(item, quantity, self.clock.now())
            .map_err(InventoryError::from)
    }

    pub fn remove(
        &self,
        state: &mut GameState,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        state
            .inventory
            .remove(item_id, quantity)
            .map_err(InventoryError::from)
    }

    pub fn sort(&self, state: &mut GameState, key: InventorySort) {
        state.inventory.sort_by(key);
    }

    /// Total carried weight and trade value.
    pub fn aggregates(&self, state: &GameState) -> (f64, i64) {
        (state.inventory.total_weight(), state.inventory.total_value())
    }

    /// Use one of the item, dispatching on its kind. Consumables are
    /// decremented; equipment swaps into its slot and returns the displaced
    /// piece to the inventory.
    #[instrument(skip(self, state), fields(item_id = %item_id))]
    pub fn use_item(
        &self,
        state: &mut GameState,
        item_id: &ItemId,
    ) -> Result<UseOutcome, InventoryError> {
        let stack = state
            .inventory
            .get(item_id)
            .ok_or_else(|| InventoryError::NotCarried(item_id.clone()))?;
        let item = stack.item.clone();

        let (narration, consumed) = match item.kind {
            ItemKind::Potion => {
                let health = item.numeric_property("restoreHealth").unwrap_or(25);
                let mana = item.numeric_property("restoreMana").unwrap_or(0);
                state.player.apply_health_delta(health);
                state.player.apply_mana_delta(mana);
                (
                    format!("You drink the {}, restoring {} health.", item.name, health),
                    true,
                )
            }
            ItemKind::Food => {
                let health = item.numeric_property("restoreHealth").unwrap_or(10);
                let mana = item.numeric_property("restoreMana").unwrap_or(5);
                state.player.apply_health_delta(health);
                state.player.apply_mana_delta(mana);
                (format!("You eat the {}. It helps a little.", item.name), true)
            }
            ItemKind::Weapon | ItemKind::Armor => {
                let displaced = state.inventory.equip(item_id)?;
                let narration = match displaced {
                    Some(old) => format!("You equip the {}, stowing the {}.", item.name, old),
                    None => format!("You equip the {}.", item.name),
                };
                (narration, false)
            }
            ItemKind::Tool => (
                format!("You make use of the {}.", item.name),
                false,
            ),
            ItemKind::Key => (
                format!("The {} might open something nearby.", item.name),
                false,
            ),
            ItemKind::Book => {
                let read_flag = format!("read.{}", item.id);
                if state.flags.contains(&read_flag) {
                    (
                        format!("You have already studied the {}.", item.name),
                        false,
                    )
                } else {
                    let experience = item.numeric_property("experience").unwrap_or(25);
                    let change = state.player.add_experience(experience);
                    state.flags.set(read_flag, true)?;
                    self.emit_level_up(change);
                    (
                        format!(
                            "You study the {}, gaining {} experience.",
                            item.name, experience
                        ),
                        false,
                    )
                }
            }
            ItemKind::Scroll => {
                let spell = item
                    .properties
                    .get("spell")
                    .cloned()
                    .unwrap_or_else(|| item.name.clone());
                state.flags.set(format!("cast.{}", spell), true)?;
                (
                    format!("The {} crumbles as '{}' takes hold.", item.name, spell),
                    true,
                )
            }
            ItemKind::Misc => (
                format!("You turn the {} over in your hands. Nothing obvious happens.", item.name),
                false,
            ),
        };

        if consumed {
            state.inventory.remove(item_id, 1)?;
            debug!(item_id = %item_id, "Consumed one unit");
        }

        Ok(UseOutcome {
            item_id: item_id.clone(),
            narration,
            consumed,
        })
    }

    fn emit_level_up(&self, change: Option<LevelChange>) {
        if let Some(change) = change {
            self.events.emit(GameEvent::LevelUp {
                from: change.from,
                to: change.to,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taleweave_domain::{EquipSlot, GameSettings};

    use crate::application::ports::MockClockPort;

    fn manager() -> InventoryManager {
        let mut clock = MockClockPort::new();
        clock
            .expect_now()
            .returning(|| Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        InventoryManager::new(Arc::new(clock), GameEventBus::default())
    }

    fn state() -> GameState {
        GameState::new(
            "riverhollow".into(),
            "intro".into(),
            GameSettings::default(),
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn potion_heals_and_is_consumed() {
        let manager = manager();
        let mut state = state();
        state.player.apply_health_delta(-40);
        let potion = Item::new("potion_minor", "Minor Potion", ItemKind::Potion)
            .stackable(5)
            .with_property("restoreHealth", "25");
        manager.add(&mut state, potion, 2).expect("add");

        let outcome = manager
            .use_item(&mut state, &"potion_minor".into())
            .expect("use");

        assert!(outcome.consumed);
        assert_eq!(state.player.health(), 85);
        assert_eq!(state.inventory.count(&"potion_minor".into()), 1);
        assert!(outcome.narration.contains("restoring 25 health"));
    }

    #[test]
    fn equipment_swaps_and_is_not_consumed() {
        let manager = manager();
        let mut state = state();
        let sword = Item::new("sword", "Iron Sword", ItemKind::Weapon).with_slot(EquipSlot::Weapon);
        let axe = Item::new("axe", "Hand Axe", ItemKind::Weapon).with_slot(EquipSlot::Weapon);
        manager.add(&mut state, sword, 1).expect("add");
        manager.add(&mut state, axe, 1).expect("add");

        manager.use_item(&mut state, &"sword".into()).expect("use");
        let outcome = manager.use_item(&mut state, &"axe".into()).expect("use");

        assert!(!outcome.consumed);
        assert!(outcome.narration.contains("stowing the sword"));
        assert_eq!(
            state
                .inventory
                .equipped_in(EquipSlot::Weapon)
                .map(|s| s.item.id.clone()),
            Some("axe".into())
        );
        assert_eq!(state.inventory.count(&"sword".into()), 1);
    }

    #[test]
    fn book_grants_experience_once() {
        let manager = manager();
        let mut state = state();
        let book = Item::new("bestiary", "Bestiary", ItemKind::Book)
            .with_property("experience", "40");
        manager.add(&mut state, book, 1).expect("add");

        manager.use_item(&mut state, &"bestiary".into()).expect("use");
        assert_eq!(state.player.experience(), 40);

        let again = manager.use_item(&mut state, &"bestiary".into()).expect("use");
        assert_eq!(state.player.experience(), 40);
        assert!(again.narration.contains("already studied"));
    }

    #[test]
    fn using_a_missing_item_errors() {
        let manager = manager();
        let mut state = state();
        let result = manager.use_item(&mut state, &"ghost".into());
        assert!(matches!(result, Err(InventoryError::NotCarried(_))));
    }

    #[test]
    fn scroll_is_consumed_and_marks_the_casting() {
        let manager = manager();
        let mut state = state();
        let scroll = Item::new("scroll_fire", "Scroll of Embers", ItemKind::Scroll)
            .with_property("spell", "firebolt");
        manager.add(&mut state, scroll, 1).expect("add");

        let outcome = manager
            .use_item(&mut state, &"scroll_fire".into())
            .expect("use");

        assert!(outcome.consumed);
        assert!(state.flags.contains("cast.firebolt"));
        assert_eq!(state.inventory.count(&"scroll_fire".into()), 0);
    }

    #[test]
    fn aggregates_report_weight_and_value() {
        let manager = manager();
        let mut state = state();
        let mut herb = Item::new("herb", "Moonpetal Herb", ItemKind::Misc).stackable(10);
        herb.weight = 0.5;
        herb.value = 3;
        manager.add(&mut state, herb, 4).expect("add");

        let (weight, value) = manager.aggregates(&state);
        assert!((weight - 2.0).abs() < f64::EPSILON);
        assert_eq!(value, 12);
    }
}
