//! Effect processing - applies tagged effect batches to game state.
//!
//! Categories apply in a fixed order: health, mana, gold, experience,
//! attributes, flags, inventory-add, inventory-remove, relationships, audio
//! cues, custom effects, event broadcast. Stats clamp into their valid
//! ranges as they apply; level, critical-health and death events derive from
//! the post-application values.
//!
//! Batches are serialized through an internal FIFO gate: at most one batch
//! is ever mid-application, and batches apply in submission order. A failing
//! custom-effect handler is recorded in the batch result and does not abort
//! the remaining effects.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use taleweave_domain::{
    CustomEffect, Effect, GameState, StatusKind, StatusRecord, STATUS_FLAG_PREFIX,
};

use crate::application::ports::{AudioSinkPort, ClockPort};
use crate::events::{GameEvent, GameEventBus};

/// Effect categories, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCategory {
    Health,
    Mana,
    Gold,
    Experience,
    Attributes,
    Flags,
    InventoryAdd,
    InventoryRemove,
    Relationships,
    Audio,
    Custom,
    Events,
}

impl std::fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Health => "health",
            Self::Mana => "mana",
            Self::Gold => "gold",
            Self::Experience => "experience",
            Self::Attributes => "attributes",
            Self::Flags => "flags",
            Self::InventoryAdd => "inventory-add",
            Self::InventoryRemove => "inventory-remove",
            Self::Relationships => "relationships",
            Self::Audio => "audio",
            Self::Custom => "custom",
            Self::Events => "events",
        };
        write!(f, "{}", name)
    }
}

/// One applied (or failed) piece of an effect batch.
#[derive(Debug, Clone)]
pub struct ProcessedEffect {
    pub category: EffectCategory,
    pub description: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ProcessedEffect {
    fn applied(category: EffectCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            description: description.into(),
            success: true,
            error: None,
        }
    }

    fn failed(category: EffectCategory, description: impl Into<String>, error: String) -> Self {
        Self {
            category,
            description: description.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Errors raised by individual effect handlers. These are isolated to the
/// failing effect: the rest of the batch still applies.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("custom effect '{kind}' failed: {reason}")]
    CustomFailed { kind: &'static str, reason: String },
}

/// Applies effect batches to game state, emitting derived events.
pub struct EffectProcessor {
    audio: Arc<dyn AudioSinkPort>,
    clock: Arc<dyn ClockPort>,
    events: GameEventBus,
    /// FIFO gate: tokio mutexes queue waiters fairly, so batches submitted
    /// while another is mid-application start strictly afterwards, in
    /// submission order.
    batch_gate: tokio::sync::Mutex<()>,
}

impl EffectProcessor {
    pub fn new(audio: Arc<dyn AudioSinkPort>, clock: Arc<dyn ClockPort>, events: GameEventBus) -> Self {
        Self {
            audio,
            clock,
            events,
            batch_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Apply a batch of effects in order, returning one record per applied
    /// (or failed) entry.
    #[instrument(skip_all, fields(batch_len = effects.len()))]
    pub async fn process(&self, effects: &[Effect], state: &mut GameState) -> Vec<ProcessedEffect> {
        let _batch_token = self.batch_gate.lock().await;

        let mut records = Vec::new();
        for effect in effects {
            self.apply_effect(effect, state, &mut records);
        }

        let failed = records.iter().filter(|r| !r.success).count();
        let applied = records.len() - failed;
        if !records.is_empty() {
            info!(applied, failed, "Applied effect batch");
            self.events
                .emit(GameEvent::EffectProcessed { applied, failed });
        }
        records
    }

    fn apply_effect(&self, effect: &Effect, state: &mut GameState, records: &mut Vec<ProcessedEffect>) {
        // 1. Health
        if let Some(delta) = effect.health {
            let before = state.player.health();
            let after = state.player.apply_health_delta(delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Health,
                format!("health {:+} ({} -> {})", delta, before, after),
            ));
            if after < before {
                let max = state.player.max_health();
                if after * 5 <= max {
                    self.events.emit(GameEvent::CriticalHealth {
                        health: after,
                        max_health: max,
                    });
                }
                if after == 0 {
                    self.events.emit(GameEvent::PlayerDeath);
                }
            }
        }

        // 2. Mana
        if let Some(delta) = effect.mana {
            let before = state.player.mana();
            let after = state.player.apply_mana_delta(delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Mana,
                format!("mana {:+} ({} -> {})", delta, before, after),
            ));
        }

        // 3. Gold
        if let Some(delta) = effect.gold {
            let after = state.player.apply_gold_delta(delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Gold,
                format!("gold {:+} (now {})", delta, after),
            ));
        }

        // 4. Experience (level derives from the new total)
        if let Some(delta) = effect.experience {
            let change = state.player.add_experience(delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Experience,
                format!("experience {:+} (total {})", delta, state.player.experience()),
            ));
            if let Some(change) = change {
                info!(from = change.from, to = change.to, "Level up");
                self.events.emit(GameEvent::LevelUp {
                    from: change.from,
                    to: change.to,
                });
            }
        }

        // 5. Named attributes
        for (name, delta) in &effect.attributes {
            let after = state.player.adjust_attribute(name, *delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Attributes,
                format!("{} {:+} (now {})", name, delta, after),
            ));
        }

        // 6. Flags
        for assignment in &effect.flags {
            match state.flags.set(&assignment.key, assignment.value.clone()) {
                Ok(()) => records.push(ProcessedEffect::applied(
                    EffectCategory::Flags,
                    format!("{} = {}", assignment.key, assignment.value),
                )),
                Err(err) => records.push(ProcessedEffect::failed(
                    EffectCategory::Flags,
                    format!("set {}", assignment.key),
                    err.to_string(),
                )),
            }
        }

        // 7. Inventory additions
        let now = self.clock.now();
        for grant in &effect.add_items {
            let description = format!("gain {} x{}", grant.item.name, grant.quantity);
            match state.inventory.add(grant.item.clone(), grant.quantity, now) {
                Ok(()) => records.push(ProcessedEffect::applied(EffectCategory::InventoryAdd, description)),
                Err(err) => records.push(ProcessedEffect::failed(
                    EffectCategory::InventoryAdd,
                    description,
                    err.to_string(),
                )),
            }
        }

        // 8. Inventory removals
        for removal in &effect.remove_items {
            let description = format!("lose {} x{}", removal.item, removal.quantity);
            match state.inventory.remove(&removal.item, removal.quantity) {
                Ok(()) => records.push(ProcessedEffect::applied(
                    EffectCategory::InventoryRemove,
                    description,
                )),
                Err(err) => records.push(ProcessedEffect::failed(
                    EffectCategory::InventoryRemove,
                    description,
                    err.to_string(),
                )),
            }
        }

        // 9. Relationships
        for delta in &effect.relationships {
            let after = state.relationships.adjust(&delta.character, delta.delta);
            records.push(ProcessedEffect::applied(
                EffectCategory::Relationships,
                format!("{} {:+} (now {})", delta.character, delta.delta, after),
            ));
        }

        // 10. Audio cues (fire-and-forget, gated by settings)
        for sound in &effect.sounds {
            if state.settings.sound_effects_enabled {
                self.audio.play_sound(sound);
            }
            records.push(ProcessedEffect::applied(
                EffectCategory::Audio,
                format!("sound '{}'", sound),
            ));
        }
        if let Some(music) = &effect.music {
            if state.settings.music_enabled {
                self.audio.play_music(music);
            }
            records.push(ProcessedEffect::applied(
                EffectCategory::Audio,
                format!("music '{}'", music),
            ));
        }

        // 11. Custom effects (isolated per effect)
        for custom in &effect.custom {
            match self.apply_custom(custom, state) {
                Ok(description) => {
                    records.push(ProcessedEffect::applied(EffectCategory::Custom, description));
                }
                Err(err) => {
                    warn!(kind = custom.kind_name(), error = %err, "Custom effect failed");
                    records.push(ProcessedEffect::failed(
                        EffectCategory::Custom,
                        custom.kind_name().to_string(),
                        err.to_string(),
                    ));
                }
            }
        }

        // 12. Named event broadcast
        for name in &effect.events {
            self.events.emit(GameEvent::Custom { name: name.clone() });
            records.push(ProcessedEffect::applied(
                EffectCategory::Events,
                format!("event '{}'", name),
            ));
        }
    }

    fn apply_custom(&self, custom: &CustomEffect, state: &mut GameState) -> Result<String, EffectError> {
        let fail = |kind: &'static str, reason: String| EffectError::CustomFailed { kind, reason };

        match custom {
            CustomEffect::Teleport { scene } => {
                if scene.as_str().trim().is_empty() {
                    return Err(fail("teleport", "empty target scene".to_string()));
                }
                state.current_scene_id = scene.clone();
                Ok(format!("teleported to '{}'", scene))
            }
            CustomEffect::Transform { form, .. } => {
                if form.trim().is_empty() {
                    return Err(fail("transform", "empty form".to_string()));
                }
                state
                    .flags
                    .set("form", form.as_str())
                    .map_err(|e| fail("transform", e.to_string()))?;
                Ok(format!("transformed into '{}'", form))
            }
            CustomEffect::Summon { entity } => {
                if entity.trim().is_empty() {
                    return Err(fail("summon", "empty entity".to_string()));
                }
                state
                    .flags
                    .set(format!("summoned.{}", entity), true)
                    .map_err(|e| fail("summon", e.to_string()))?;
                Ok(format!("summoned '{}'", entity))
            }
            CustomEffect::Curse {
                name,
                duration_secs,
                effects,
            } => self.apply_status(StatusKind::Curse, name, *duration_secs, effects, state),
            CustomEffect::Blessing {
                name,
                duration_secs,
                effects,
            } => self.apply_status(StatusKind::Blessing, name, *duration_secs, effects, state),
        }
    }

    /// Apply a curse/blessing: its nested effects bite once, immediately, and
    /// a status record is stored under a `status.` flag for expiry sweeps and
    /// for content to gate on.
    fn apply_status(
        &self,
        kind: StatusKind,
        name: &str,
        duration_secs: u64,
        effects: &[Effect],
        state: &mut GameState,
    ) -> Result<String, EffectError> {
        let kind_name: &'static str = match kind {
            StatusKind::Curse => "curse",
            StatusKind::Blessing => "blessing",
        };
        if name.trim().is_empty() {
            return Err(EffectError::CustomFailed {
                kind: kind_name,
                reason: "empty status name".to_string(),
            });
        }

        let record = StatusRecord {
            kind,
            name: name.to_string(),
            started_at: self.clock.now(),
            duration_secs,
            effects: effects.to_vec(),
        };
        let payload = serde_json::to_string(&record).map_err(|e| EffectError::CustomFailed {
            kind: kind_name,
            reason: e.to_string(),
        })?;
        state
            .flags
            .set(record.flag_key(), payload)
            .map_err(|e| EffectError::CustomFailed {
                kind: kind_name,
                reason: e.to_string(),
            })?;

        // The status' own effects apply once, now. Nested custom effects are
        // ignored to keep application non-recursive.
        let mut nested_records = Vec::new();
        for effect in effects {
            let mut flat = effect.clone();
            flat.custom.clear();
            self.apply_effect(&flat, state, &mut nested_records);
        }

        Ok(format!("{} '{}' for {}s", kind_name, name, duration_secs))
    }

    /// Clear expired curse/blessing statuses, emitting `StatusExpired` for
    /// each. Called by the engine on every scene transition.
    pub fn sweep_expired_statuses(&self, state: &mut GameState) -> Vec<StatusRecord> {
        let now = self.clock.now();
        let keys: Vec<String> = state
            .flags
            .keys_with_prefix(STATUS_FLAG_PREFIX)
            .cloned()
            .collect();

        let mut expired = Vec::new();
        for key in keys {
            let Some(payload) = state.flags.get(&key).and_then(|v| v.as_text().map(String::from))
            else {
                warn!(key, "Status flag is not a text record; leaving as-is");
                continue;
            };
            let record: StatusRecord = match serde_json::from_str(&payload) {
                Ok(record) => record,
                Err(err) => {
                    warn!(key, error = %err, "Unparseable status record; leaving as-is");
                    continue;
                }
            };
            if record.is_expired(now) {
                debug!(key, "Status expired");
                state.flags.remove(&key);
                self.events.emit(GameEvent::StatusExpired {
                    kind: record.kind,
                    name: record.name.clone(),
                });
                expired.push(record);
            }
        }
        expired
    }
}
