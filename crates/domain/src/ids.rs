use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uuid-backed identifiers for engine-generated identity (saves, sessions).
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

/// String-backed identifiers for author-supplied content ids.
///
/// Content is keyed by stable strings chosen by story authors
/// ("village_square", "rusty_key"), so these wrap a String rather than a Uuid.
macro_rules! define_str_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Engine-generated identity
define_id!(GameId);
define_id!(SaveSlotId);

// Authored content identity
define_str_id!(StoryId);
define_str_id!(SceneId);
define_str_id!(ChoiceId);
define_str_id!(ItemId);
define_str_id!(CharacterId);
define_str_id!(AchievementId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(GameId::new(), GameId::new());
    }

    #[test]
    fn str_ids_round_trip_serde() {
        let id = SceneId::new("village_square");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"village_square\"");
        let back: SceneId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn str_ids_display_their_value() {
        assert_eq!(ChoiceId::new("open_door").to_string(), "open_door");
    }
}
