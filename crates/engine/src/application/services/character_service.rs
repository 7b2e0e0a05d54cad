//! NPC interaction resolution.
//!
//! Interactions (talk / trade / quest / gift) are gated by relationship
//! score and required flags; mood derives from the relationship thresholds
//! adjusted by personality traits. Gifting is rate-limited to once per 24
//! in-game hours per character, where in-game time is the accumulated
//! playtime clock.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use taleweave_domain::{
    Character, CharacterId, CharacterInteraction, FlagValue, GameState, InteractionKind, Mood,
    SceneId,
};

use crate::application::ports::{ContentError, ContentSourcePort};

/// One in-game day, measured in playtime seconds.
const GIFT_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Errors from interaction resolution.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("character '{0}' is not in this scene")]
    NotInScene(CharacterId),

    #[error("character '{character}' does not offer '{kind}'")]
    NotOffered {
        character: CharacterId,
        kind: InteractionKind,
    },

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Result of attempting an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOutcome {
    pub character_id: CharacterId,
    pub kind: InteractionKind,
    /// False when the interaction was gated (low relationship, missing
    /// flags, gift cooldown); `response` then carries the refusal.
    pub success: bool,
    pub response: String,
    pub mood: Mood,
    /// Relationship score after the interaction.
    pub relationship: i32,
}

/// Resolves per-scene NPC interactions against game state.
pub struct CharacterManager {
    content: Arc<dyn ContentSourcePort>,
}

impl CharacterManager {
    pub fn new(content: Arc<dyn ContentSourcePort>) -> Self {
        Self { content }
    }

    #[instrument(skip(self, state), fields(scene_id = %scene_id, character_id = %character_id, kind = %kind))]
    pub async fn interact(
        &self,
        state: &mut GameState,
        scene_id: &SceneId,
        character_id: &CharacterId,
        kind: InteractionKind,
    ) -> Result<InteractionOutcome, InteractionError> {
        let characters = self.content.scene_characters(scene_id).await?;
        let character = characters
            .iter()
            .find(|c| c.id == *character_id)
            .ok_or_else(|| InteractionError::NotInScene(character_id.clone()))?;

        let interaction = character
            .interaction(kind)
            .ok_or_else(|| InteractionError::NotOffered {
                character: character_id.clone(),
                kind,
            })?;

        let score = state.relationships.score(character_id);
        let mood = character.mood(score);

        if let Some(refusal) = self.gate(character, interaction, state, score) {
            debug!(score, "Interaction gated");
            return Ok(InteractionOutcome {
                character_id: character_id.clone(),
                kind,
                success: false,
                response: refusal,
                mood,
                relationship: score,
            });
        }

        if kind == InteractionKind::Gift {
            if let Some(refusal) = self.gift_cooldown_refusal(character, state) {
                return Ok(InteractionOutcome {
                    character_id: character_id.clone(),
                    kind,
                    success: false,
                    response: refusal,
                    mood,
                    relationship: score,
                });
            }
            self.mark_gift_given(character_id, state);
        }

        let relationship = if interaction.relationship_delta != 0 {
            state
                .relationships
                .adjust(character_id, interaction.relationship_delta)
        } else {
            score
        };

        Ok(InteractionOutcome {
            character_id: character_id.clone(),
            kind,
            success: true,
            response: interaction.response.clone(),
            mood: character.mood(relationship),
            relationship,
        })
    }

    /// Relationship and flag gates; returns the refusal line when blocked.
    fn gate(
        &self,
        character: &Character,
        interaction: &CharacterInteraction,
        state: &GameState,
        score: i32,
    ) -> Option<String> {
        let flags_met = interaction
            .required_flags
            .iter()
            .all(|flag| state.flags.get(flag).and_then(FlagValue::as_bool) == Some(true));

        if score >= interaction.min_relationship && flags_met {
            return None;
        }
        Some(interaction.refusal.clone().unwrap_or_else(|| {
            format!("{} has nothing to say to you right now.", character.name)
        }))
    }

    fn gift_flag_key(character_id: &CharacterId) -> String {
        format!("gift.last.{}", character_id)
    }

    /// A second gift within 24 in-game hours is declined.
    fn gift_cooldown_refusal(&self, character: &Character, state: &GameState) -> Option<String> {
        let key = Self::gift_flag_key(&character.id);
        let last = state.flags.get(&key).and_then(FlagValue::as_number)?;
        let now = state.progress.playtime_seconds();
        if now.saturating_sub(last as u64) < GIFT_COOLDOWN_SECS {
            Some(format!(
                "{} has already received a gift today.",
                character.name
            ))
        } else {
            None
        }
    }

    fn mark_gift_given(&self, character_id: &CharacterId, state: &mut GameState) {
        let key = Self::gift_flag_key(character_id);
        let now = state.progress.playtime_seconds() as f64;
        // Key is never empty (formatted above), so this cannot fail.
        let _ = state.flags.set(key, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taleweave_domain::{GameSettings, PersonalityTrait};

    use crate::application::ports::MockContentSourcePort;

    fn state() -> GameState {
        GameState::new(
            "riverhollow".into(),
            "square".into(),
            GameSettings::default(),
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap(),
        )
    }

    fn elder() -> Character {
        Character::new("elder_mira", "Elder Mira")
            .with_trait(PersonalityTrait::Stoic)
            .with_interaction(
                CharacterInteraction::new(InteractionKind::Talk, "Welcome, traveler.")
                    .with_relationship_delta(1),
            )
            .with_interaction(
                CharacterInteraction::new(InteractionKind::Quest, "Recover my locket.")
                    .requiring_relationship(20)
                    .requiring_flag("heard_rumor"),
            )
            .with_interaction(
                CharacterInteraction::new(InteractionKind::Gift, "How thoughtful.")
                    .with_relationship_delta(5),
            )
    }

    fn manager_with(characters: Vec<Character>) -> CharacterManager {
        let mut content = MockContentSourcePort::new();
        content
            .expect_scene_characters()
            .returning(move |_| Ok(characters.clone()));
        CharacterManager::new(Arc::new(content))
    }

    #[tokio::test]
    async fn talk_succeeds_and_nudges_relationship() {
        let manager = manager_with(vec![elder()]);
        let mut state = state();

        let outcome = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Talk)
            .await
            .expect("interact");

        assert!(outcome.success);
        assert_eq!(outcome.response, "Welcome, traveler.");
        assert_eq!(outcome.relationship, 1);
    }

    #[tokio::test]
    async fn quest_gated_by_relationship_and_flag() {
        let manager = manager_with(vec![elder()]);
        let mut state = state();

        let refused = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Quest)
            .await
            .expect("interact");
        assert!(!refused.success);

        state.relationships.set(&"elder_mira".into(), 25);
        state.flags.set("heard_rumor", true).expect("set");
        let offered = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Quest)
            .await
            .expect("interact");
        assert!(offered.success);
        assert_eq!(offered.response, "Recover my locket.");
    }

    #[tokio::test]
    async fn gift_rate_limited_per_in_game_day() {
        let manager = manager_with(vec![elder()]);
        let mut state = state();

        let first = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Gift)
            .await
            .expect("interact");
        assert!(first.success);
        assert_eq!(first.relationship, 5);

        // A second gift moments later is declined.
        state.progress.add_playtime(60);
        let second = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Gift)
            .await
            .expect("interact");
        assert!(!second.success);
        assert!(second.response.contains("already received a gift"));

        // After a full in-game day it is welcome again.
        state.progress.add_playtime(GIFT_COOLDOWN_SECS);
        let third = manager
            .interact(&mut state, &"square".into(), &"elder_mira".into(), InteractionKind::Gift)
            .await
            .expect("interact");
        assert!(third.success);
        assert_eq!(third.relationship, 10);
    }

    #[tokio::test]
    async fn unknown_character_errors() {
        let manager = manager_with(vec![elder()]);
        let mut state = state();

        let result = manager
            .interact(&mut state, &"square".into(), &"stranger".into(), InteractionKind::Talk)
            .await;
        assert!(matches!(result, Err(InteractionError::NotInScene(_))));
    }

    #[tokio::test]
    async fn mood_reflects_traits_and_score() {
        let grump = Character::new("old_tam", "Old Tam")
            .with_trait(PersonalityTrait::Grumpy)
            .with_interaction(CharacterInteraction::new(InteractionKind::Talk, "Hmph."));
        let manager = manager_with(vec![grump]);
        let mut state = state();

        let outcome = manager
            .interact(&mut state, &"square".into(), &"old_tam".into(), InteractionKind::Talk)
            .await
            .expect("interact");
        assert_eq!(outcome.mood, Mood::Cold);
    }
}
