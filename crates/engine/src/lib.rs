//! Taleweave engine.
//!
//! The rule/state engine for interactive fiction: decides which narrative
//! content is visible, which player actions are allowed, and how game state
//! mutates in response. Presentation, the persistence backend, and audio
//! playback are external collaborators behind ports; subscribe to the
//! [`events::GameEventBus`] for notifications.

pub mod application;
pub mod engine;
pub mod events;
pub mod infrastructure;

pub use application::ports::{
    AudioSinkPort, ClockPort, ContentError, ContentSourcePort, PersistenceError, PersistencePort,
    SaveGame, SaveSlot,
};
pub use application::services::{
    CharacterManager, ChoiceContext, ChoiceError, ChoiceProcessor, ChoiceResult, Consequence,
    ConsequenceKind, EffectCategory, EffectError, EffectProcessor, InteractionError,
    InteractionOutcome, InventoryError, InventoryManager, ProcessedChoice, ProcessedEffect,
    ProcessedScene, SceneError, SceneProcessor, UseOutcome,
};
pub use engine::{ChoiceOutcome, EngineError, EnginePhase, GameEngine};
pub use events::{GameEvent, GameEventBus};
