//! Item content type - objects that can be carried, used, and equipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// An object that can be possessed or interacted with.
///
/// This is a data-carrying struct with no invariants to protect; any
/// combination of field values is a valid item definition. Stacking and
/// equipping invariants live on `Inventory`, which owns the runtime copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ItemKind,
    #[serde(default)]
    pub rarity: Rarity,
    /// Trade value in gold.
    #[serde(default)]
    pub value: i64,
    /// Carry weight in arbitrary units.
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub stackable: bool,
    /// Maximum quantity a single stack may hold.
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Slot this item occupies when equipped (None = not equippable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<EquipSlot>,
    /// Item-specific properties ("restoreHealth" -> "25", "spell" -> "firebolt").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

fn default_max_stack() -> u32 {
    99
}

impl Item {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind,
            rarity: Rarity::Common,
            value: 0,
            weight: 0.0,
            stackable: false,
            max_stack: default_max_stack(),
            slot: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn stackable(mut self, max_stack: u32) -> Self {
        self.stackable = true;
        self.max_stack = max_stack.max(1);
        self
    }

    pub fn with_slot(mut self, slot: EquipSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Numeric property lookup, for use-dispatch amounts.
    pub fn numeric_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(|v| v.parse().ok())
    }
}

/// Kinds of items, each with its own use behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Potion,
    Food,
    Weapon,
    Armor,
    Tool,
    Key,
    Book,
    Scroll,
    Misc,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Potion => "Potion",
            Self::Food => "Food",
            Self::Weapon => "Weapon",
            Self::Armor => "Armor",
            Self::Tool => "Tool",
            Self::Key => "Key",
            Self::Book => "Book",
            Self::Scroll => "Scroll",
            Self::Misc => "Misc",
        };
        write!(f, "{}", name)
    }
}

/// Slot an equippable item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
}

impl std::fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Weapon => "Weapon",
            Self::Armor => "Armor",
            Self::Accessory => "Accessory",
        };
        write!(f, "{}", name)
    }
}

/// Item rarity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Ordering rank for inventory sorting (higher = rarer).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Common => 0,
            Self::Uncommon => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
        }
    }
}
