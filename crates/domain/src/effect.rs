//! Effect bundles - descriptions of state mutations to apply.
//!
//! An `Effect` may simultaneously carry stat deltas, attribute deltas, flag
//! assignments, inventory changes, relationship deltas, audio cues, tagged
//! custom effects, and named game events. Application order and semantics
//! are owned by the engine's effect processor; this module only describes
//! the mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Item;
use crate::ids::{CharacterId, ItemId, SceneId};
use crate::state::FlagValue;

/// Flag-key prefix under which curse/blessing status records are stored.
pub const STATUS_FLAG_PREFIX: &str = "status.";

/// A bundle of mutations applied together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mana: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<i64>,
    /// Named attribute deltas ("strength" -> +1).
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub attributes: std::collections::BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagAssignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_items: Vec<ItemGrant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_items: Vec<ItemRemoval>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipDelta>,
    /// Sound cue names for the audio sink.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sounds: Vec<String>,
    /// Background music change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<CustomEffect>,
    /// Named game events to broadcast after everything else applied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl Effect {
    pub fn is_empty(&self) -> bool {
        self.health.is_none()
            && self.mana.is_none()
            && self.gold.is_none()
            && self.experience.is_none()
            && self.attributes.is_empty()
            && self.flags.is_empty()
            && self.add_items.is_empty()
            && self.remove_items.is_empty()
            && self.relationships.is_empty()
            && self.sounds.is_empty()
            && self.music.is_none()
            && self.custom.is_empty()
            && self.events.is_empty()
    }
}

/// A flag write carried by an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagAssignment {
    pub key: String,
    pub value: FlagValue,
}

/// Items granted by an effect. Carries the full item definition so effects
/// are self-contained and do not need a content lookup to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrant {
    pub item: Item,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Items removed by an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRemoval {
    pub item: ItemId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// A relationship adjustment carried by an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDelta {
    pub character: CharacterId,
    pub delta: i32,
}

/// The closed set of tagged custom effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CustomEffect {
    /// Move the player to another scene outside normal choice navigation.
    Teleport { scene: SceneId },
    /// Change the player's form ("wolf", "mist").
    Transform {
        form: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u64>,
    },
    /// Bring a named entity into the scene.
    Summon { entity: String },
    /// A timed negative status; nested effects describe its bite.
    Curse {
        name: String,
        duration_secs: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        effects: Vec<Effect>,
    },
    /// A timed positive status; nested effects describe its boon.
    Blessing {
        name: String,
        duration_secs: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        effects: Vec<Effect>,
    },
}

impl CustomEffect {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Teleport { .. } => "teleport",
            Self::Transform { .. } => "transform",
            Self::Summon { .. } => "summon",
            Self::Curse { .. } => "curse",
            Self::Blessing { .. } => "blessing",
        }
    }
}

/// Whether a stored status is a curse or a blessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Curse,
    Blessing,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Curse => write!(f, "curse"),
            Self::Blessing => write!(f, "blessing"),
        }
    }
}

/// The record stored (JSON-encoded, under a `status.` flag) when a curse or
/// blessing is applied. The engine sweeps these on scene transitions and
/// clears the ones whose duration has elapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub kind: StatusKind,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl StatusRecord {
    /// Flag key this status is stored under.
    pub fn flag_key(&self) -> String {
        format!("{}{}.{}", STATUS_FLAG_PREFIX, self.kind, self.name)
    }

    /// Whether the status has run out as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let deadline = self.started_at + chrono::Duration::seconds(self.duration_secs as i64);
        now >= deadline
    }
}
