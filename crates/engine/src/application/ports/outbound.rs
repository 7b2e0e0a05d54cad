//! Outbound ports - interfaces the engine depends on.
//!
//! Adapters live in `infrastructure`; tests use the generated mocks. The
//! audio sink is fire-and-forget by contract: the engine never awaits it and
//! never treats a cue as fallible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taleweave_domain::{
    Achievement, Character, GameState, SaveSlotId, Scene, SceneId, StoryId,
};

// =============================================================================
// Persistence
// =============================================================================

/// Errors from the persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save slot {0} not found")]
    SlotNotFound(SaveSlotId),

    #[error("save payload is corrupt: {0}")]
    Corrupt(String),

    /// Transport- or storage-level failure.
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// A full save payload: slot identity plus the serialized game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGame {
    pub slot_id: SaveSlotId,
    /// Player-supplied name for manual saves; None for autosaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub saved_at: DateTime<Utc>,
    pub state: GameState,
}

/// Listing metadata for one save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSlot {
    pub id: SaveSlotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub story_id: StoryId,
    pub scene_id: SceneId,
    pub playtime_seconds: u64,
    pub saved_at: DateTime<Utc>,
}

impl SaveSlot {
    /// Derive listing metadata from a save payload.
    pub fn describing(save: &SaveGame) -> Self {
        Self {
            id: save.slot_id,
            name: save.name.clone(),
            story_id: save.state.story_id.clone(),
            scene_id: save.state.current_scene_id.clone(),
            playtime_seconds: save.state.progress.playtime_seconds(),
            saved_at: save.saved_at,
        }
    }
}

/// Port for the save backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn save(&self, save: &SaveGame) -> Result<(), PersistenceError>;
    async fn load(&self, slot: SaveSlotId) -> Result<SaveGame, PersistenceError>;
    async fn list_slots(&self) -> Result<Vec<SaveSlot>, PersistenceError>;
    async fn delete(&self, slot: SaveSlotId) -> Result<(), PersistenceError>;
}

// =============================================================================
// Content source
// =============================================================================

/// Errors from the content source.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("scene '{0}' not found")]
    SceneNotFound(SceneId),

    #[error("story '{0}' not found")]
    StoryNotFound(StoryId),

    /// Content that failed authoring-time validation (malformed conditions,
    /// dangling scene references).
    #[error("invalid content: {0}")]
    Invalid(String),

    #[error("content backend error: {0}")]
    Backend(String),
}

/// Read-only port for authored story content, keyed by stable string ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSourcePort: Send + Sync {
    async fn scene(&self, id: &SceneId) -> Result<Scene, ContentError>;
    async fn scene_characters(&self, id: &SceneId) -> Result<Vec<Character>, ContentError>;
    async fn story_achievements(&self, story: &StoryId) -> Result<Vec<Achievement>, ContentError>;
    /// The scene a fresh playthrough of the story starts in.
    async fn story_entry_scene(&self, story: &StoryId) -> Result<SceneId, ContentError>;
    /// Total scene count, used to derive the story-progress percentage.
    async fn story_scene_count(&self, story: &StoryId) -> Result<usize, ContentError>;
}

// =============================================================================
// Audio sink
// =============================================================================

/// Fire-and-forget audio output. Never awaited, never fallible from the
/// engine's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait AudioSinkPort: Send + Sync {
    fn play_sound(&self, name: &str);
    fn play_music(&self, name: &str);
    fn pause_all(&self);
    fn resume_all(&self);
    fn stop_all(&self);
}

// =============================================================================
// Clock
// =============================================================================

/// Injected wall clock, so timed choices and expiry sweeps are testable.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
