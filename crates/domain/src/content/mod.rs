//! Authored content types: scenes, choices, characters, achievements, items.
//!
//! Content is read-only input to the engine, fetched from a content source
//! by stable string id. These are data-carrying structs; gating and
//! application semantics live in the condition evaluator and the engine
//! services.

mod achievement;
mod character;
mod item;

pub use achievement::Achievement;
pub use character::{Character, CharacterInteraction, InteractionKind, Mood, PersonalityTrait};
pub use item::{EquipSlot, Item, ItemKind, Rarity};

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::effect::Effect;
use crate::ids::{ChoiceId, SceneId};

/// Default time limit for timed choices.
pub const DEFAULT_TIMED_CHOICE_LIMIT_SECS: u64 = 30;

/// A narrative content unit with gating conditions and a choice list.
///
/// `content` is a template: `{player.<field>}`, `{flag.<name>}` and
/// `{inventory.count.<id>}` placeholders are substituted at scene-processing
/// time in a single pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    /// Gates whether the scene may be entered at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Condition>,
    /// Applied automatically on entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Background music cue for the audio sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
}

impl Scene {
    pub fn new(id: impl Into<SceneId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: content.into(),
            conditions: None,
            effects: Vec::new(),
            choices: Vec::new(),
            music: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Condition) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn choice(&self, id: &ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == *id)
    }
}

/// A player-selectable transition between scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    /// None means selecting this choice ends the story.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_scene: Option<SceneId>,
    /// Gates visibility and selectability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Condition>,
    /// Applied on selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    /// Structured, human-readable reasons shown when the choice is
    /// ineligible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub kind: ChoiceKind,
    /// Authoring-time kill switch, checked after conditions.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Choice {
    pub fn new(id: impl Into<ChoiceId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            target_scene: None,
            conditions: None,
            effects: Vec::new(),
            requirements: Vec::new(),
            kind: ChoiceKind::Plain,
            available: true,
        }
    }

    pub fn leading_to(mut self, scene: impl Into<SceneId>) -> Self {
        self.target_scene = Some(scene.into());
        self
    }

    pub fn with_conditions(mut self, conditions: Condition) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn timed(mut self, limit_secs: u64) -> Self {
        self.kind = ChoiceKind::Timed { limit_secs };
        self
    }
}

/// The behavioral kind of a choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChoiceKind {
    #[default]
    Plain,
    /// Re-checks a nested condition at selection time, on top of the
    /// choice-level conditions.
    Conditional { condition: Condition },
    /// Must be selected within `limit_secs` of scene entry; fails closed.
    Timed {
        #[serde(default = "default_time_limit")]
        limit_secs: u64,
    },
}

fn default_time_limit() -> u64 {
    DEFAULT_TIMED_CHOICE_LIMIT_SECS
}

/// A human-readable eligibility requirement attached to a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub description: String,
    /// When present, lets the engine report which requirements are unmet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_defaults_to_plain_and_available() {
        let json = r#"{"id":"leave","text":"Leave the square."}"#;
        let choice: Choice = serde_json::from_str(json).expect("deserialize");
        assert_eq!(choice.kind, ChoiceKind::Plain);
        assert!(choice.available);
        assert!(choice.target_scene.is_none());
    }

    #[test]
    fn timed_choice_defaults_limit() {
        let json = r#"{"id":"duck","text":"Duck!","kind":{"type":"timed"}}"#;
        let choice: Choice = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            choice.kind,
            ChoiceKind::Timed {
                limit_secs: DEFAULT_TIMED_CHOICE_LIMIT_SECS
            }
        );
    }

    #[test]
    fn scene_finds_choice_by_id() {
        let scene = Scene::new("square", "The square is quiet.")
            .with_choice(Choice::new("leave", "Leave.").leading_to("gate"));
        assert!(scene.choice(&"leave".into()).is_some());
        assert!(scene.choice(&"missing".into()).is_none());
    }
}
