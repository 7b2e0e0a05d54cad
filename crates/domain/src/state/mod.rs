//! Mutable game state: the single aggregate the engine owns.
//!
//! `GameState` is created at new-game start or deserialized at load, mutated
//! exclusively during effect-application passes, persisted periodically, and
//! discarded on reset. Invariants (stat ranges, stacking, relationship
//! bounds) are protected by the nested types, not by callers.

mod flags;
mod inventory;
mod relationships;
mod settings;

pub use flags::{FlagMap, FlagValue};
pub use inventory::{Inventory, InventorySort, ItemStack, DEFAULT_INVENTORY_SLOTS};
pub use relationships::{RelationshipMap, RELATIONSHIP_MAX, RELATIONSHIP_MIN};
pub use settings::{GameSettings, TextSpeed};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AchievementId, ChoiceId, GameId, SceneId, StoryId};

/// Version stamp written into every save payload.
pub const SAVE_FORMAT_VERSION: u32 = 1;

// =============================================================================
// Player
// =============================================================================

/// The player's vital stats and attributes.
///
/// Fields are private: every mutation clamps into valid range (health/mana in
/// [0, max], gold >= 0) and level is always the value derived from experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    level: u32,
    health: i64,
    max_health: i64,
    mana: i64,
    max_mana: i64,
    experience: i64,
    gold: i64,
    #[serde(default)]
    attributes: std::collections::BTreeMap<String, i64>,
}

/// A level boundary crossing produced by an experience gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub from: u32,
    pub to: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            level: 1,
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            experience: 0,
            gold: 0,
            attributes: std::collections::BTreeMap::new(),
        }
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level derived from experience: `floor(sqrt(xp / 100)) + 1`.
    pub fn level_for_experience(experience: i64) -> u32 {
        let xp = experience.max(0) as f64;
        (xp / 100.0).sqrt().floor() as u32 + 1
    }

    /// Apply a health delta, clamping into [0, max]. Returns the new value.
    pub fn apply_health_delta(&mut self, delta: i64) -> i64 {
        self.health = (self.health.saturating_add(delta)).clamp(0, self.max_health);
        self.health
    }

    /// Apply a mana delta, clamping into [0, max]. Returns the new value.
    pub fn apply_mana_delta(&mut self, delta: i64) -> i64 {
        self.mana = (self.mana.saturating_add(delta)).clamp(0, self.max_mana);
        self.mana
    }

    /// Apply a gold delta, clamping at zero. Returns the new value.
    pub fn apply_gold_delta(&mut self, delta: i64) -> i64 {
        self.gold = self.gold.saturating_add(delta).max(0);
        self.gold
    }

    /// Add experience (clamped at zero) and re-derive level. Crossing a level
    /// boundary upward fully restores health and mana and reports the change.
    pub fn add_experience(&mut self, delta: i64) -> Option<LevelChange> {
        self.experience = self.experience.saturating_add(delta).max(0);
        let derived = Self::level_for_experience(self.experience);
        let previous = self.level;
        self.level = derived;

        if derived > previous {
            self.health = self.max_health;
            self.mana = self.max_mana;
            Some(LevelChange {
                from: previous,
                to: derived,
            })
        } else {
            None
        }
    }

    pub fn adjust_attribute(&mut self, name: impl Into<String>, delta: i64) -> i64 {
        let entry = self.attributes.entry(name.into()).or_insert(0);
        *entry = entry.saturating_add(delta);
        *entry
    }

    pub fn attribute(&self, name: &str) -> i64 {
        self.attributes.get(name).copied().unwrap_or(0)
    }

    /// Health at or below 20% of max (and above zero).
    pub fn is_critical(&self) -> bool {
        self.health > 0 && self.health * 5 <= self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    // Accessors

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn health(&self) -> i64 {
        self.health
    }

    pub fn max_health(&self) -> i64 {
        self.max_health
    }

    pub fn mana(&self) -> i64 {
        self.mana
    }

    pub fn max_mana(&self) -> i64 {
        self.max_mana
    }

    pub fn experience(&self) -> i64 {
        self.experience
    }

    pub fn gold(&self) -> i64 {
        self.gold
    }

    pub fn attributes(&self) -> &std::collections::BTreeMap<String, i64> {
        &self.attributes
    }
}

// =============================================================================
// Progress
// =============================================================================

/// One entry in the player's choice history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub scene_id: SceneId,
    pub choice_id: ChoiceId,
    pub chosen_at: DateTime<Utc>,
}

/// Story progression bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    scenes_visited: Vec<SceneId>,
    choices_made: Vec<ChoiceRecord>,
    achievements_unlocked: Vec<AchievementId>,
    playtime_seconds: u64,
    story_progress: f64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scene visit; already-visited scenes are not duplicated.
    /// Returns true when the scene was newly visited.
    pub fn record_visit(&mut self, scene_id: SceneId) -> bool {
        if self.scenes_visited.contains(&scene_id) {
            return false;
        }
        self.scenes_visited.push(scene_id);
        true
    }

    pub fn record_choice(&mut self, scene_id: SceneId, choice_id: ChoiceId, at: DateTime<Utc>) {
        self.choices_made.push(ChoiceRecord {
            scene_id,
            choice_id,
            chosen_at: at,
        });
    }

    /// Returns true when the achievement was newly unlocked.
    pub fn unlock_achievement(&mut self, achievement_id: AchievementId) -> bool {
        if self.achievements_unlocked.contains(&achievement_id) {
            return false;
        }
        self.achievements_unlocked.push(achievement_id);
        true
    }

    pub fn add_playtime(&mut self, seconds: u64) {
        self.playtime_seconds = self.playtime_seconds.saturating_add(seconds);
    }

    /// Set the story-progress percentage, clamped into [0, 100].
    pub fn set_story_progress(&mut self, percent: f64) {
        self.story_progress = percent.clamp(0.0, 100.0);
    }

    pub fn has_visited(&self, scene_id: &SceneId) -> bool {
        self.scenes_visited.contains(scene_id)
    }

    pub fn has_made_choice(&self, choice_id: &ChoiceId) -> bool {
        self.choices_made.iter().any(|r| r.choice_id == *choice_id)
    }

    pub fn has_achievement(&self, achievement_id: &AchievementId) -> bool {
        self.achievements_unlocked.contains(achievement_id)
    }

    pub fn scenes_visited(&self) -> &[SceneId] {
        &self.scenes_visited
    }

    pub fn choices_made(&self) -> &[ChoiceRecord] {
        &self.choices_made
    }

    pub fn achievements_unlocked(&self) -> &[AchievementId] {
        &self.achievements_unlocked
    }

    pub fn playtime_seconds(&self) -> u64 {
        self.playtime_seconds
    }

    pub fn story_progress(&self) -> f64 {
        self.story_progress
    }
}

// =============================================================================
// Save metadata
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub version: u32,
}

impl SaveMetadata {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            last_modified: at,
            version: SAVE_FORMAT_VERSION,
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_modified = at;
    }
}

// =============================================================================
// Game state aggregate
// =============================================================================

/// The full mutable state of one playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: GameId,
    pub story_id: StoryId,
    pub current_scene_id: SceneId,
    pub player: PlayerState,
    pub inventory: Inventory,
    pub flags: FlagMap,
    pub relationships: RelationshipMap,
    pub progress: Progress,
    pub settings: GameSettings,
    pub metadata: SaveMetadata,
}

impl GameState {
    /// Fresh state for a new playthrough starting at `entry_scene`.
    pub fn new(
        story_id: StoryId,
        entry_scene: SceneId,
        settings: GameSettings,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GameId::new(),
            story_id,
            current_scene_id: entry_scene,
            player: PlayerState::new(),
            inventory: Inventory::new(),
            flags: FlagMap::new(),
            relationships: RelationshipMap::new(),
            progress: Progress::new(),
            settings,
            metadata: SaveMetadata::new(at),
        }
    }
}
