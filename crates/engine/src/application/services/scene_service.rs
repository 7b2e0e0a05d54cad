//! Scene processing - resolves what the player actually sees.
//!
//! Entry conditions gate the whole scene (a failed gate is a hard error, not
//! a silent skip: navigation must never enter an inaccessible scene).
//! Content templating is a single, non-recursive substitution pass; choices
//! are filtered independently through the condition evaluator and keep their
//! authored order.

use regex_lite::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use taleweave_domain::{
    evaluate_opt, Choice, ChoiceId, ChoiceKind, EvalContext, FlagValue, GameState, Requirement,
    Scene, SceneId,
};

/// Errors from scene processing.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene's entry conditions do not hold for the current state.
    #[error("scene '{0}' is inaccessible")]
    Inaccessible(SceneId),
}

/// A choice that passed its visibility conditions, rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedChoice {
    pub id: ChoiceId,
    pub text: String,
    pub target_scene: Option<SceneId>,
    pub kind: ChoiceKind,
    /// Requirements surfaced to the player for context.
    pub requirements: Vec<Requirement>,
}

/// A scene resolved against game state: rendered content plus the accessible
/// choices in authored order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedScene {
    pub id: SceneId,
    pub title: Option<String>,
    pub content: String,
    pub choices: Vec<ProcessedChoice>,
    pub music: Option<String>,
}

impl ProcessedScene {
    pub fn choice(&self, id: &ChoiceId) -> Option<&ProcessedChoice> {
        self.choices.iter().find(|c| c.id == *id)
    }
}

/// Resolves a scene's accessibility, content, and choice list.
pub struct SceneProcessor {
    placeholder: Regex,
}

impl Default for SceneProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneProcessor {
    pub fn new() -> Self {
        // {player.<field>}, {flag.<name>}, {inventory.count.<id>}
        #[allow(clippy::expect_used)]
        let placeholder = Regex::new(r"\{(player|flag|inventory\.count)\.([A-Za-z0-9_\-]+)\}")
            .expect("placeholder pattern is valid");
        Self { placeholder }
    }

    /// Resolve `scene` against `state`.
    ///
    /// Fails with [`SceneError::Inaccessible`] when the entry conditions do
    /// not hold - callers must treat that as a navigation bug or authoring
    /// error, never skip past it.
    #[instrument(skip_all, fields(scene_id = %scene.id))]
    pub fn process(
        &self,
        scene: &Scene,
        state: &GameState,
        ctx: &EvalContext,
    ) -> Result<ProcessedScene, SceneError> {
        if !evaluate_opt(scene.conditions.as_ref(), state, ctx) {
            return Err(SceneError::Inaccessible(scene.id.clone()));
        }

        let choices: Vec<ProcessedChoice> = scene
            .choices
            .iter()
            .filter(|choice| self.is_choice_visible(choice, state, ctx))
            .map(|choice| ProcessedChoice {
                id: choice.id.clone(),
                text: self.render(&choice.text, state),
                target_scene: choice.target_scene.clone(),
                kind: choice.kind.clone(),
                requirements: choice.requirements.clone(),
            })
            .collect();

        debug!(
            visible = choices.len(),
            authored = scene.choices.len(),
            "Filtered scene choices"
        );

        Ok(ProcessedScene {
            id: scene.id.clone(),
            title: scene.title.clone(),
            content: self.render(&scene.content, state),
            choices,
            music: scene.music.clone(),
        })
    }

    fn is_choice_visible(&self, choice: &Choice, state: &GameState, ctx: &EvalContext) -> bool {
        evaluate_opt(choice.conditions.as_ref(), state, ctx)
    }

    /// Single substitution pass. Placeholders that do not resolve stay
    /// literal in the output.
    pub fn render(&self, template: &str, state: &GameState) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures<'_>| {
                let namespace = &caps[1];
                let key = &caps[2];
                match self.lookup(namespace, key, state) {
                    Some(value) => value,
                    None => {
                        warn!(namespace, key, "Unresolved content placeholder");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    fn lookup(&self, namespace: &str, key: &str, state: &GameState) -> Option<String> {
        match namespace {
            "player" => match key {
                "level" => Some(state.player.level().to_string()),
                "health" => Some(state.player.health().to_string()),
                "maxHealth" => Some(state.player.max_health().to_string()),
                "mana" => Some(state.player.mana().to_string()),
                "maxMana" => Some(state.player.max_mana().to_string()),
                "experience" => Some(state.player.experience().to_string()),
                "gold" => Some(state.player.gold().to_string()),
                attribute => state
                    .player
                    .attributes()
                    .get(attribute)
                    .map(ToString::to_string),
            },
            "flag" => state.flags.get(key).map(FlagValue::to_string),
            "inventory.count" => Some(state.inventory.count(&key.into()).to_string()),
            _ => None,
        }
    }
}
