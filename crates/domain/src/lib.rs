//! Taleweave domain layer.
//!
//! Pure data model and rule algorithms for the narrative engine: game state,
//! content types (scenes, choices, items, characters, achievements), the
//! condition tree with its evaluator, and effect bundles. No I/O, no async,
//! no clocks - anything time-dependent receives its timestamps from callers.

extern crate self as taleweave_domain;

pub mod condition;
pub mod content;
pub mod effect;
pub mod error;
pub mod game_time;
pub mod ids;
pub mod state;

pub use condition::{evaluate, evaluate_opt, CmpOp, Condition, EvalContext, Operand};
pub use content::{
    Achievement, Character, CharacterInteraction, Choice, ChoiceKind, EquipSlot, InteractionKind,
    Item, ItemKind, Mood, PersonalityTrait, Rarity, Requirement, Scene,
    DEFAULT_TIMED_CHOICE_LIMIT_SECS,
};
pub use effect::{
    CustomEffect, Effect, FlagAssignment, ItemGrant, ItemRemoval, RelationshipDelta, StatusKind,
    StatusRecord, STATUS_FLAG_PREFIX,
};
pub use error::DomainError;
pub use game_time::TimeOfDay;
pub use ids::{AchievementId, CharacterId, ChoiceId, GameId, ItemId, SaveSlotId, SceneId, StoryId};
pub use state::{
    ChoiceRecord, FlagMap, FlagValue, GameSettings, GameState, Inventory, InventorySort,
    ItemStack, LevelChange, PlayerState, Progress, RelationshipMap, SaveMetadata, TextSpeed,
    SAVE_FORMAT_VERSION,
};
