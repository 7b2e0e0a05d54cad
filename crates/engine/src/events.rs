//! Game event channel.
//!
//! Every subsystem publishes to one shared `GameEventBus` handed in by
//! composition; presentation layers subscribe for notifications. Failures
//! travel the same channel as successes (`GameEvent::EngineError`), keeping
//! engine-internal error types off the presentation boundary.

use serde::Serialize;
use tokio::sync::broadcast;

use taleweave_domain::{AchievementId, ChoiceId, SaveSlotId, SceneId, StatusKind};

/// Default buffered capacity of the broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events the engine broadcasts to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GameEvent {
    SceneChanged {
        scene_id: SceneId,
    },
    ChoiceMade {
        scene_id: SceneId,
        choice_id: ChoiceId,
    },
    /// An effect batch finished applying.
    EffectProcessed {
        applied: usize,
        failed: usize,
    },
    AchievementUnlocked {
        achievement_id: AchievementId,
        name: String,
    },
    LevelUp {
        from: u32,
        to: u32,
    },
    CriticalHealth {
        health: i64,
        max_health: i64,
    },
    PlayerDeath,
    /// A curse or blessing ran out and was cleared.
    StatusExpired {
        kind: StatusKind,
        name: String,
    },
    /// A named event broadcast by authored content.
    Custom {
        name: String,
    },
    GameSaved {
        slot_id: SaveSlotId,
        manual: bool,
    },
    GamePaused,
    GameResumed,
    GameEnded,
    /// A failure surfaced on the same channel as successes.
    EngineError {
        message: String,
    },
}

/// Shared broadcast bus for [`GameEvent`]s.
///
/// Cheap to clone; publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct GameEventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl Default for GameEventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl GameEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Best-effort: a lagging or absent subscriber never
    /// breaks the engine flow.
    pub fn emit(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
