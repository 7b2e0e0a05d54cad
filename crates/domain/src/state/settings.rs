//! Per-save gameplay settings.
//!
//! Settings are persisted inside the save payload and deserialize
//! forward-compatibly: every field has a serde default so older saves load
//! after new settings are added.

use serde::{Deserialize, Serialize};

/// Player-facing settings carried in every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    /// Whether the autosave loop runs while a game is active.
    pub autosave_enabled: bool,
    /// Seconds between autosave ticks.
    pub autosave_interval_secs: u64,
    /// Presentation-layer text reveal speed.
    pub text_speed: TextSpeed,
    pub music_enabled: bool,
    pub sound_effects_enabled: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_interval_secs: 300,
            text_speed: TextSpeed::Normal,
            music_enabled: true,
            sound_effects_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_autosave() {
        let settings = GameSettings::default();
        assert!(settings.autosave_enabled);
        assert_eq!(settings.autosave_interval_secs, 300);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: GameSettings =
            serde_json::from_str(r#"{"autosaveEnabled":false}"#).expect("deserialize");
        assert!(!settings.autosave_enabled);
        assert_eq!(settings.text_speed, TextSpeed::Normal);
        assert!(settings.music_enabled);
    }
}
