//! Character content type - NPCs the player can interact with.

use serde::{Deserialize, Serialize};

use crate::ids::CharacterId;

/// An NPC that can appear in scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<PersonalityTrait>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<CharacterInteraction>,
}

impl Character {
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            traits: Vec::new(),
            interactions: Vec::new(),
        }
    }

    pub fn with_trait(mut self, personality: PersonalityTrait) -> Self {
        self.traits.push(personality);
        self
    }

    pub fn with_interaction(mut self, interaction: CharacterInteraction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn interaction(&self, kind: InteractionKind) -> Option<&CharacterInteraction> {
        self.interactions.iter().find(|i| i.kind == kind)
    }

    /// Mood derived from a relationship score, nudged by personality.
    pub fn mood(&self, relationship: i32) -> Mood {
        let shift: i32 = self.traits.iter().map(PersonalityTrait::mood_shift).sum();
        Mood::from_score(relationship).shifted(shift)
    }
}

/// Personality traits that color an NPC's mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersonalityTrait {
    Cheerful,
    Grumpy,
    Stoic,
    Proud,
    Shy,
    Generous,
}

impl PersonalityTrait {
    /// Steps this trait moves the mood ladder (positive = friendlier).
    pub fn mood_shift(&self) -> i32 {
        match self {
            Self::Cheerful => 1,
            Self::Generous => 1,
            Self::Grumpy => -1,
            Self::Proud => -1,
            Self::Stoic | Self::Shy => 0,
        }
    }
}

/// Mood ladder derived from relationship thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mood {
    Hostile,
    Cold,
    Neutral,
    Warm,
    Friendly,
}

impl Mood {
    pub fn from_score(score: i32) -> Mood {
        match score {
            s if s >= 60 => Mood::Friendly,
            s if s >= 20 => Mood::Warm,
            s if s > -20 => Mood::Neutral,
            s if s > -60 => Mood::Cold,
            _ => Mood::Hostile,
        }
    }

    /// Move `steps` up or down the ladder, saturating at the ends.
    pub fn shifted(self, steps: i32) -> Mood {
        const LADDER: [Mood; 5] = [
            Mood::Hostile,
            Mood::Cold,
            Mood::Neutral,
            Mood::Warm,
            Mood::Friendly,
        ];
        let index = LADDER.iter().position(|m| *m == self).unwrap_or(2) as i32;
        let index = (index + steps).clamp(0, LADDER.len() as i32 - 1) as usize;
        LADDER[index]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mood::Hostile => "Hostile",
            Mood::Cold => "Cold",
            Mood::Neutral => "Neutral",
            Mood::Warm => "Warm",
            Mood::Friendly => "Friendly",
        }
    }
}

/// The interaction verbs an NPC may support in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    Talk,
    Trade,
    Quest,
    Gift,
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Talk => "talk",
            Self::Trade => "trade",
            Self::Quest => "quest",
            Self::Gift => "gift",
        };
        write!(f, "{}", name)
    }
}

/// One interaction an NPC offers, with its gates and responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInteraction {
    pub kind: InteractionKind,
    /// Minimum relationship score required.
    #[serde(default = "default_min_relationship")]
    pub min_relationship: i32,
    /// Flags that must all be set (to boolean true) before this is offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_flags: Vec<String>,
    /// Response when the interaction succeeds.
    pub response: String,
    /// Response when gated; a generic refusal is used if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
    /// Relationship change on success (gifts typically use a positive value).
    #[serde(default)]
    pub relationship_delta: i32,
}

fn default_min_relationship() -> i32 {
    crate::state::RELATIONSHIP_MIN
}

impl CharacterInteraction {
    pub fn new(kind: InteractionKind, response: impl Into<String>) -> Self {
        Self {
            kind,
            min_relationship: default_min_relationship(),
            required_flags: Vec::new(),
            response: response.into(),
            refusal: None,
            relationship_delta: 0,
        }
    }

    pub fn requiring_relationship(mut self, min: i32) -> Self {
        self.min_relationship = min;
        self
    }

    pub fn requiring_flag(mut self, flag: impl Into<String>) -> Self {
        self.required_flags.push(flag.into());
        self
    }

    pub fn with_relationship_delta(mut self, delta: i32) -> Self {
        self.relationship_delta = delta;
        self
    }
}
