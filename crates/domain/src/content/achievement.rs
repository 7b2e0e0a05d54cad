//! Achievement content type.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::ids::AchievementId;

/// A story achievement, unlocked when its condition holds.
///
/// The engine evaluates achievement conditions after every scene transition;
/// unlocking is monotone (an achievement never re-locks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: Condition,
    /// Hidden from listings until unlocked.
    #[serde(default)]
    pub secret: bool,
}

impl Achievement {
    pub fn new(
        id: impl Into<AchievementId>,
        name: impl Into<String>,
        condition: Condition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            condition,
            secret: false,
        }
    }
}
