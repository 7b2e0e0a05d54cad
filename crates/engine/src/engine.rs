//! The game engine: lifecycle state machine and orchestration.
//!
//! Wires the processors together and owns the only copy of `GameState`.
//! All mutation funnels through one tokio mutex, so choice resolution, the
//! playtime tick, and the autosave tick run to completion without observing
//! each other's partial writes. Pausing stops the background loops but never
//! preempts an in-flight choice resolution - a pause request simply queues
//! on the same mutex.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use taleweave_domain::{
    evaluate_opt, Achievement, CharacterId, ChoiceId, EvalContext, GameSettings, GameState,
    InteractionKind, InventorySort, ItemId, SaveSlotId, Scene, SceneId, StoryId, TimeOfDay,
    SAVE_FORMAT_VERSION,
};

use crate::application::ports::{
    AudioSinkPort, ClockPort, ContentError, ContentSourcePort, PersistenceError, PersistencePort,
    SaveGame, SaveSlot,
};
use crate::application::services::{
    CharacterManager, ChoiceContext, ChoiceProcessor, ChoiceResult, EffectProcessor,
    InteractionError, InteractionOutcome, InventoryError, InventoryManager, ProcessedScene,
    SceneError, SceneProcessor, UseOutcome,
};
use crate::events::{GameEvent, GameEventBus};

/// Lifecycle phases of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    Initialized,
    Running,
    Paused,
    /// Terminal for the playthrough; a new game or load leaves it.
    Ended,
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Ended => "ended",
        };
        write!(f, "{}", name)
    }
}

/// Engine-level errors. Every variant is also reported on the event channel.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("'{action}' is not valid while the engine is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: EnginePhase,
    },

    #[error("no active game")]
    NoActiveGame,

    #[error("choice '{0}' is not available in the current scene")]
    UnknownChoice(ChoiceId),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// What a successful `make_choice` produced.
#[derive(Debug, Clone)]
pub struct ChoiceOutcome {
    pub result: ChoiceResult,
    /// The next scene, when the choice navigated somewhere.
    pub scene: Option<ProcessedScene>,
    /// True when the choice ended the story.
    pub ended: bool,
}

struct ActiveSession {
    state: GameState,
    scene: ProcessedScene,
    raw_scene: Scene,
    scene_entered_at: DateTime<Utc>,
    achievements: Vec<Achievement>,
    scene_count: usize,
    autosave_slot: SaveSlotId,
}

struct EngineInner {
    phase: EnginePhase,
    session: Option<ActiveSession>,
    tasks: Vec<JoinHandle<()>>,
}

/// The orchestrating state machine.
pub struct GameEngine {
    inner: Arc<Mutex<EngineInner>>,
    content: Arc<dyn ContentSourcePort>,
    persistence: Arc<dyn PersistencePort>,
    audio: Arc<dyn AudioSinkPort>,
    clock: Arc<dyn ClockPort>,
    events: GameEventBus,
    scenes: SceneProcessor,
    choices: ChoiceProcessor,
    effects: EffectProcessor,
    inventory: InventoryManager,
    characters: CharacterManager,
}

impl GameEngine {
    /// Build an engine over the given ports. The engine starts
    /// `Uninitialized`; call [`GameEngine::initialize`] before use.
    pub fn new(
        content: Arc<dyn ContentSourcePort>,
        persistence: Arc<dyn PersistencePort>,
        audio: Arc<dyn AudioSinkPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let events = GameEventBus::default();
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                phase: EnginePhase::Uninitialized,
                session: None,
                tasks: Vec::new(),
            })),
            effects: EffectProcessor::new(audio.clone(), clock.clone(), events.clone()),
            inventory: InventoryManager::new(clock.clone(), events.clone()),
            characters: CharacterManager::new(content.clone()),
            scenes: SceneProcessor::new(),
            choices: ChoiceProcessor::new(),
            content,
            persistence,
            audio,
            clock,
            events,
        }
    }

    /// The event bus presentation layers subscribe to.
    pub fn events(&self) -> &GameEventBus {
        &self.events
    }

    pub async fn phase(&self) -> EnginePhase {
        self.inner.lock().await.phase
    }

    /// Snapshot of the current game state, if a game is active.
    pub async fn state_snapshot(&self) -> Option<GameState> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.state.clone())
    }

    /// The currently presented scene, if a game is active.
    pub async fn current_scene(&self) -> Option<ProcessedScene> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.scene.clone())
    }

    /// Wire up the engine. Valid exactly once, from `Uninitialized`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Uninitialized {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "initialize",
                phase: inner.phase,
            }));
        }
        inner.phase = EnginePhase::Initialized;
        info!("Engine initialized");
        Ok(())
    }

    /// Start a fresh playthrough of `story_id` and present its entry scene.
    #[instrument(skip(self), fields(story_id = %story_id))]
    pub async fn start_new_game(&self, story_id: StoryId) -> Result<ProcessedScene, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase == EnginePhase::Uninitialized {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "startNewGame",
                phase: inner.phase,
            }));
        }
        Self::stop_tasks(&mut inner);

        let result = self.begin_new_game(story_id).await;
        match result {
            Ok(session) => {
                let scene = session.scene.clone();
                inner.session = Some(session);
                inner.phase = EnginePhase::Running;
                self.start_background_tasks(&mut inner);
                info!("New game started");
                Ok(scene)
            }
            Err(err) => Err(self.emit_error(err)),
        }
    }

    async fn begin_new_game(&self, story_id: StoryId) -> Result<ActiveSession, EngineError> {
        let entry = self.content.story_entry_scene(&story_id).await?;
        let achievements = self.content.story_achievements(&story_id).await?;
        let scene_count = self.content.story_scene_count(&story_id).await?;

        let now = self.clock.now();
        let mut state = GameState::new(story_id, entry.clone(), GameSettings::default(), now);

        let (raw_scene, scene) = self
            .resolve_scene(&mut state, &entry, true, &achievements, scene_count)
            .await?;

        Ok(ActiveSession {
            state,
            scene,
            raw_scene,
            scene_entered_at: self.clock.now(),
            achievements,
            scene_count,
            autosave_slot: SaveSlotId::new(),
        })
    }

    /// Load a saved game from `slot` and present its current scene.
    #[instrument(skip(self), fields(slot = %slot))]
    pub async fn load_game(&self, slot: SaveSlotId) -> Result<ProcessedScene, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase == EnginePhase::Uninitialized {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "loadGame",
                phase: inner.phase,
            }));
        }
        Self::stop_tasks(&mut inner);

        let result = self.restore_game(slot).await;
        match result {
            Ok(session) => {
                let scene = session.scene.clone();
                inner.session = Some(session);
                inner.phase = EnginePhase::Running;
                self.start_background_tasks(&mut inner);
                info!("Game loaded");
                Ok(scene)
            }
            Err(err) => Err(self.emit_error(err)),
        }
    }

    async fn restore_game(&self, slot: SaveSlotId) -> Result<ActiveSession, EngineError> {
        let save = self.persistence.load(slot).await?;
        if save.state.metadata.version != SAVE_FORMAT_VERSION {
            return Err(PersistenceError::Corrupt(format!(
                "unsupported save version {}",
                save.state.metadata.version
            ))
            .into());
        }

        let story_id = save.state.story_id.clone();
        let achievements = self.content.story_achievements(&story_id).await?;
        let scene_count = self.content.story_scene_count(&story_id).await?;

        let current = save.state.current_scene_id.clone();
        let mut state = save.state;
        // Entry effects already applied when the scene was first entered;
        // re-processing only re-renders and re-filters.
        let (raw_scene, scene) = self
            .resolve_scene(&mut state, &current, false, &achievements, scene_count)
            .await?;

        Ok(ActiveSession {
            state,
            scene,
            raw_scene,
            scene_entered_at: self.clock.now(),
            achievements,
            scene_count,
            // Autosaves never overwrite the slot that was loaded.
            autosave_slot: SaveSlotId::new(),
        })
    }

    /// Resolve and select a choice in the current scene: validate, apply its
    /// effects, record it, and navigate (or end the story).
    #[instrument(skip(self), fields(choice_id = %choice_id))]
    pub async fn make_choice(&self, choice_id: &ChoiceId) -> Result<ChoiceOutcome, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Running {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "makeChoice",
                phase: inner.phase,
            }));
        }
        let session = inner.session.as_mut().ok_or(EngineError::NoActiveGame)?;

        // Only choices that passed visibility filtering are selectable.
        if session.scene.choice(choice_id).is_none() {
            return Err(self.emit_error(EngineError::UnknownChoice(choice_id.clone())));
        }
        let Some(choice) = session.raw_scene.choice(choice_id).cloned() else {
            return Err(self.emit_error(EngineError::UnknownChoice(choice_id.clone())));
        };

        let now = self.clock.now();
        let ctx = ChoiceContext {
            eval: EvalContext {
                time_of_day: TimeOfDay::from_timestamp(now),
            },
            elapsed_in_scene: now - session.scene_entered_at,
        };
        let result = self.choices.process(&choice, &session.state, &ctx);
        if !result.success {
            debug!("Choice rejected by validation");
            return Ok(ChoiceOutcome {
                result,
                scene: None,
                ended: false,
            });
        }

        let scene_before = session.state.current_scene_id.clone();
        self.effects.process(&result.effects, &mut session.state).await;
        session
            .state
            .progress
            .record_choice(session.scene.id.clone(), choice_id.clone(), now);
        self.events.emit(GameEvent::ChoiceMade {
            scene_id: session.scene.id.clone(),
            choice_id: choice_id.clone(),
        });

        // An explicit target wins; otherwise a teleport effect may have moved
        // the player; otherwise the story ends.
        let destination = match &choice.target_scene {
            Some(target) => Some(target.clone()),
            None if session.state.current_scene_id != scene_before => {
                Some(session.state.current_scene_id.clone())
            }
            None => None,
        };

        match destination {
            Some(target) => {
                let navigation = self
                    .resolve_scene(
                        &mut session.state,
                        &target,
                        true,
                        &session.achievements,
                        session.scene_count,
                    )
                    .await;
                match navigation {
                    Ok((raw_scene, scene)) => {
                        session.raw_scene = raw_scene;
                        session.scene = scene.clone();
                        session.scene_entered_at = self.clock.now();
                        Ok(ChoiceOutcome {
                            result,
                            scene: Some(scene),
                            ended: false,
                        })
                    }
                    Err(err) => Err(self.emit_error(err)),
                }
            }
            None => {
                // The story ends, exactly once; further choices are rejected
                // by the phase check above.
                inner.phase = EnginePhase::Ended;
                Self::stop_tasks(&mut inner);
                self.audio.stop_all();
                self.events.emit(GameEvent::GameEnded);
                info!("Story ended");
                Ok(ChoiceOutcome {
                    result,
                    scene: None,
                    ended: true,
                })
            }
        }
    }

    /// Use an inventory item in the active game.
    pub async fn use_item(&self, item_id: &ItemId) -> Result<UseOutcome, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Running {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "useItem",
                phase: inner.phase,
            }));
        }
        let session = inner.session.as_mut().ok_or(EngineError::NoActiveGame)?;
        self.inventory
            .use_item(&mut session.state, item_id)
            .map_err(|e| self.emit_error(e.into()))
    }

    /// Sort the active game's inventory.
    pub async fn sort_inventory(&self, key: InventorySort) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        let session = inner.session.as_mut().ok_or(EngineError::NoActiveGame)?;
        self.inventory.sort(&mut session.state, key);
        Ok(())
    }

    /// Interact with an NPC present in the current scene.
    pub async fn interact_with_character(
        &self,
        character_id: &CharacterId,
        kind: InteractionKind,
    ) -> Result<InteractionOutcome, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Running {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "interact",
                phase: inner.phase,
            }));
        }
        let session = inner.session.as_mut().ok_or(EngineError::NoActiveGame)?;
        let scene_id = session.state.current_scene_id.clone();
        self.characters
            .interact(&mut session.state, &scene_id, character_id, kind)
            .await
            .map_err(|e| self.emit_error(e.into()))
    }

    /// Pause the running game: stops both background loops and the audio.
    /// An in-flight choice resolution finishes first (it holds the mutex).
    pub async fn pause_game(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Running {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "pauseGame",
                phase: inner.phase,
            }));
        }
        Self::stop_tasks(&mut inner);
        inner.phase = EnginePhase::Paused;
        self.audio.pause_all();
        self.events.emit(GameEvent::GamePaused);
        info!("Game paused");
        Ok(())
    }

    /// Resume a paused game: restarts the loops and the audio.
    pub async fn resume_game(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Paused {
            return Err(self.emit_error(EngineError::InvalidPhase {
                action: "resumeGame",
                phase: inner.phase,
            }));
        }
        inner.phase = EnginePhase::Running;
        self.start_background_tasks(&mut inner);
        self.audio.resume_all();
        self.events.emit(GameEvent::GameResumed);
        info!("Game resumed");
        Ok(())
    }

    /// Write an autosave into the session's dedicated autosave slot.
    /// Skipped (returning `Ok(false)`) when autosave is disabled in settings.
    pub async fn autosave(&self) -> Result<bool, EngineError> {
        // autosave_once reports failures on the event channel itself.
        Self::autosave_once(&self.inner, &self.persistence, &self.events, &self.clock).await
    }

    /// Write a named manual save into a fresh slot.
    #[instrument(skip(self, name))]
    pub async fn manual_save(&self, name: impl Into<String>) -> Result<SaveSlotId, EngineError> {
        let name = name.into();
        let save = {
            let mut inner = self.inner.lock().await;
            let session = inner.session.as_mut().ok_or(EngineError::NoActiveGame)?;
            let now = self.clock.now();
            session.state.metadata.touch(now);
            SaveGame {
                slot_id: SaveSlotId::new(),
                name: Some(name),
                saved_at: now,
                state: session.state.clone(),
            }
        };

        match self.persistence.save(&save).await {
            Ok(()) => {
                self.events.emit(GameEvent::GameSaved {
                    slot_id: save.slot_id,
                    manual: true,
                });
                info!(slot = %save.slot_id, "Manual save written");
                Ok(save.slot_id)
            }
            Err(err) => Err(self.emit_error(err.into())),
        }
    }

    /// List all known save slots, newest first.
    pub async fn list_saves(&self) -> Result<Vec<SaveSlot>, EngineError> {
        self.persistence
            .list_slots()
            .await
            .map_err(|e| self.emit_error(e.into()))
    }

    /// Stop everything. Valid from any phase; the engine returns to
    /// `Uninitialized` and the session is discarded.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_tasks(&mut inner);
        inner.session = None;
        inner.phase = EnginePhase::Uninitialized;
        self.audio.stop_all();
        info!("Engine shut down");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fetch, gate, and enter a scene: apply entry effects, sweep expired
    /// statuses, update progress, check achievements, cue music, and emit
    /// `SceneChanged`. Returns the raw and processed scene.
    async fn resolve_scene(
        &self,
        state: &mut GameState,
        scene_id: &SceneId,
        apply_entry_effects: bool,
        achievements: &[Achievement],
        scene_count: usize,
    ) -> Result<(Scene, ProcessedScene), EngineError> {
        let scene = self.content.scene(scene_id).await?;

        let now = self.clock.now();
        let ctx = EvalContext {
            time_of_day: TimeOfDay::from_timestamp(now),
        };
        // Gate first: an inaccessible scene is a hard error and nothing below
        // may run.
        if !evaluate_opt(scene.conditions.as_ref(), state, &ctx) {
            return Err(SceneError::Inaccessible(scene_id.clone()).into());
        }

        state.current_scene_id = scene_id.clone();
        if apply_entry_effects && !scene.effects.is_empty() {
            self.effects.process(&scene.effects, state).await;
        }
        self.effects.sweep_expired_statuses(state);

        if state.progress.record_visit(scene_id.clone()) && scene_count > 0 {
            let percent =
                state.progress.scenes_visited().len() as f64 / scene_count as f64 * 100.0;
            state.progress.set_story_progress(percent);
        }
        self.check_achievements(state, achievements, &ctx);

        let processed = self.scenes.process(&scene, state, &ctx)?;
        if let Some(music) = &processed.music {
            if state.settings.music_enabled {
                self.audio.play_music(music);
            }
        }
        self.events.emit(GameEvent::SceneChanged {
            scene_id: scene_id.clone(),
        });
        Ok((scene, processed))
    }

    fn check_achievements(
        &self,
        state: &mut GameState,
        achievements: &[Achievement],
        ctx: &EvalContext,
    ) {
        for achievement in achievements {
            if state.progress.has_achievement(&achievement.id) {
                continue;
            }
            if achievement.condition.evaluate(state, ctx)
                && state.progress.unlock_achievement(achievement.id.clone())
            {
                info!(achievement = %achievement.id, "Achievement unlocked");
                self.events.emit(GameEvent::AchievementUnlocked {
                    achievement_id: achievement.id.clone(),
                    name: achievement.name.clone(),
                });
            }
        }
    }

    fn start_background_tasks(&self, inner: &mut EngineInner) {
        let autosave_interval_secs = inner
            .session
            .as_ref()
            .map(|s| s.state.settings.autosave_interval_secs)
            .unwrap_or(300)
            .max(1);

        // Playtime accumulator: one second of playtime per second running.
        let playtime_inner = Arc::clone(&self.inner);
        inner.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                let mut inner = playtime_inner.lock().await;
                if inner.phase == EnginePhase::Running {
                    if let Some(session) = inner.session.as_mut() {
                        session.state.progress.add_playtime(1);
                    }
                }
            }
        }));

        // Autosave loop: fires only while running with autosave enabled.
        // Failures are logged, surfaced as events, and retried next tick.
        let autosave_inner = Arc::clone(&self.inner);
        let persistence = Arc::clone(&self.persistence);
        let events = self.events.clone();
        let clock = Arc::clone(&self.clock);
        inner.tasks.push(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(autosave_interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) =
                    Self::autosave_once(&autosave_inner, &persistence, &events, &clock).await
                {
                    warn!(error = %err, "Autosave failed; will retry next tick");
                }
            }
        }));
    }

    /// One autosave attempt. Returns `Ok(false)` when skipped (not running,
    /// or autosave disabled in settings).
    async fn autosave_once(
        inner: &Arc<Mutex<EngineInner>>,
        persistence: &Arc<dyn PersistencePort>,
        events: &GameEventBus,
        clock: &Arc<dyn ClockPort>,
    ) -> Result<bool, EngineError> {
        let save = {
            let mut guard = inner.lock().await;
            if guard.phase != EnginePhase::Running && guard.phase != EnginePhase::Paused {
                return Ok(false);
            }
            let Some(session) = guard.session.as_mut() else {
                return Ok(false);
            };
            if !session.state.settings.autosave_enabled {
                return Ok(false);
            }
            let now = clock.now();
            session.state.metadata.touch(now);
            SaveGame {
                slot_id: session.autosave_slot,
                name: None,
                saved_at: now,
                state: session.state.clone(),
            }
        };

        // The snapshot is complete; saving happens outside the lock so a slow
        // backend never blocks interaction.
        match persistence.save(&save).await {
            Ok(()) => {
                debug!(slot = %save.slot_id, "Autosave written");
                events.emit(GameEvent::GameSaved {
                    slot_id: save.slot_id,
                    manual: false,
                });
                Ok(true)
            }
            Err(err) => {
                events.emit(GameEvent::EngineError {
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn stop_tasks(inner: &mut EngineInner) {
        for task in inner.tasks.drain(..) {
            task.abort();
        }
    }

    /// Report a failure on the event channel and hand it back to the caller.
    fn emit_error(&self, error: EngineError) -> EngineError {
        self.events.emit(GameEvent::EngineError {
            message: error.to_string(),
        });
        error
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        // Background tasks hold only a weak claim to usefulness once the
        // engine is gone; abort them if the lock is free.
        if let Ok(mut inner) = self.inner.try_lock() {
            Self::stop_tasks(&mut inner);
        }
    }
}
