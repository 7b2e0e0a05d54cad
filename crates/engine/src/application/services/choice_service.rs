//! Choice processing - validates a selection and previews its consequences.
//!
//! Validation runs in a fixed order: choice-level conditions, the authoring
//! availability flag, then kind-specific rules (conditional choices re-check
//! their nested condition; timed choices fail closed once the limit since
//! scene entry has elapsed). The consequence preview is read-only and never
//! touches game state.

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use taleweave_domain::{
    evaluate_opt, Choice, ChoiceKind, CustomEffect, Effect, EvalContext, GameState, SceneId,
    DEFAULT_TIMED_CHOICE_LIMIT_SECS,
};

/// Why a choice was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChoiceError {
    #[error("requirements not met: {}", unmet.join("; "))]
    ConditionsNotMet { unmet: Vec<String> },

    #[error("choice is not available")]
    Unavailable,

    #[error("time limit of {limit_secs}s exceeded")]
    Expired { limit_secs: u64 },
}

/// Everything the validator needs beyond the choice and state.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceContext {
    pub eval: EvalContext,
    /// Wall-clock time since the current scene was entered.
    pub elapsed_in_scene: Duration,
}

/// An anticipated, human-readable delta shown before the player commits.
#[derive(Debug, Clone, PartialEq)]
pub struct Consequence {
    pub kind: ConsequenceKind,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsequenceKind {
    Health,
    Mana,
    Gold,
    Experience,
    Attribute,
    Flag,
    ItemGained,
    ItemLost,
    Relationship,
    Status,
}

/// Outcome of validating one choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResult {
    pub success: bool,
    pub target_scene: Option<SceneId>,
    /// Effects to apply when the choice succeeds.
    pub effects: Vec<Effect>,
    pub consequences: Vec<Consequence>,
    pub error: Option<ChoiceError>,
}

impl ChoiceResult {
    fn rejected(choice: &Choice, consequences: Vec<Consequence>, error: ChoiceError) -> Self {
        Self {
            success: false,
            target_scene: choice.target_scene.clone(),
            effects: Vec::new(),
            consequences,
            error: Some(error),
        }
    }
}

/// Validates choices and computes consequence previews.
#[derive(Debug, Default)]
pub struct ChoiceProcessor;

impl ChoiceProcessor {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(choice_id = %choice.id))]
    pub fn process(&self, choice: &Choice, state: &GameState, ctx: &ChoiceContext) -> ChoiceResult {
        let consequences = self.preview(choice);

        // 1. Choice-level conditions.
        if !evaluate_opt(choice.conditions.as_ref(), state, &ctx.eval) {
            let unmet = self.unmet_requirements(choice, state, ctx);
            debug!(unmet = unmet.len(), "Choice conditions not met");
            return ChoiceResult::rejected(
                choice,
                consequences,
                ChoiceError::ConditionsNotMet { unmet },
            );
        }

        // 2. Authoring availability flag.
        if !choice.available {
            return ChoiceResult::rejected(choice, consequences, ChoiceError::Unavailable);
        }

        // 3. Kind-specific rules.
        match &choice.kind {
            ChoiceKind::Plain => {}
            ChoiceKind::Conditional { condition } => {
                if !condition.evaluate(state, &ctx.eval) {
                    let unmet = self.unmet_requirements(choice, state, ctx);
                    return ChoiceResult::rejected(
                        choice,
                        consequences,
                        ChoiceError::ConditionsNotMet { unmet },
                    );
                }
            }
            ChoiceKind::Timed { limit_secs } => {
                let limit = if *limit_secs == 0 {
                    DEFAULT_TIMED_CHOICE_LIMIT_SECS
                } else {
                    *limit_secs
                };
                // Fails closed: a negative or missing elapsed reading counts
                // as expired.
                let within = ctx.elapsed_in_scene >= Duration::zero()
                    && ctx.elapsed_in_scene < Duration::seconds(limit as i64);
                if !within {
                    return ChoiceResult::rejected(
                        choice,
                        consequences,
                        ChoiceError::Expired { limit_secs: limit },
                    );
                }
            }
        }

        ChoiceResult {
            success: true,
            target_scene: choice.target_scene.clone(),
            effects: choice.effects.clone(),
            consequences,
            error: None,
        }
    }

    /// Human-readable descriptions of requirements whose conditions fail
    /// (requirements without conditions are always listed - they exist to be
    /// shown).
    fn unmet_requirements(
        &self,
        choice: &Choice,
        state: &GameState,
        ctx: &ChoiceContext,
    ) -> Vec<String> {
        choice
            .requirements
            .iter()
            .filter(|req| match &req.condition {
                Some(condition) => !condition.evaluate(state, &ctx.eval),
                None => true,
            })
            .map(|req| req.description.clone())
            .collect()
    }

    /// Read-only preview of what the choice's effects would change.
    pub fn preview(&self, choice: &Choice) -> Vec<Consequence> {
        let mut out = Vec::new();
        for effect in &choice.effects {
            describe_effect(effect, &mut out);
        }
        out
    }
}

fn describe_effect(effect: &Effect, out: &mut Vec<Consequence>) {
    let mut stat = |kind, label: &str, delta: Option<i64>| {
        if let Some(delta) = delta {
            out.push(Consequence {
                kind,
                description: format!("{} {:+}", label, delta),
            });
        }
    };
    stat(ConsequenceKind::Health, "Health", effect.health);
    stat(ConsequenceKind::Mana, "Mana", effect.mana);
    stat(ConsequenceKind::Gold, "Gold", effect.gold);
    stat(ConsequenceKind::Experience, "Experience", effect.experience);

    for (name, delta) in &effect.attributes {
        out.push(Consequence {
            kind: ConsequenceKind::Attribute,
            description: format!("{} {:+}", name, delta),
        });
    }
    for assignment in &effect.flags {
        out.push(Consequence {
            kind: ConsequenceKind::Flag,
            description: format!("Sets {} = {}", assignment.key, assignment.value),
        });
    }
    for grant in &effect.add_items {
        out.push(Consequence {
            kind: ConsequenceKind::ItemGained,
            description: format!("Gain {} x{}", grant.item.name, grant.quantity),
        });
    }
    for removal in &effect.remove_items {
        out.push(Consequence {
            kind: ConsequenceKind::ItemLost,
            description: format!("Lose {} x{}", removal.item, removal.quantity),
        });
    }
    for delta in &effect.relationships {
        out.push(Consequence {
            kind: ConsequenceKind::Relationship,
            description: format!("{} {:+}", delta.character, delta.delta),
        });
    }
    for custom in &effect.custom {
        match custom {
            CustomEffect::Curse { name, .. } => out.push(Consequence {
                kind: ConsequenceKind::Status,
                description: format!("Cursed: {}", name),
            }),
            CustomEffect::Blessing { name, .. } => out.push(Consequence {
                kind: ConsequenceKind::Status,
                description: format!("Blessed: {}", name),
            }),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taleweave_domain::{
        CmpOp, Condition, FlagValue, GameSettings, Operand, Requirement, TimeOfDay,
    };

    fn ctx_with_elapsed(secs: i64) -> ChoiceContext {
        ChoiceContext {
            eval: EvalContext {
                time_of_day: TimeOfDay::Morning,
            },
            elapsed_in_scene: Duration::seconds(secs),
        }
    }

    fn state() -> GameState {
        GameState::new(
            "riverhollow".into(),
            "intro".into(),
            GameSettings::default(),
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap(),
        )
    }

    fn processor() -> ChoiceProcessor {
        ChoiceProcessor::new()
    }

    #[test]
    fn plain_choice_passes() {
        let choice = Choice::new("leave", "Leave.").leading_to("gate");
        let result = processor().process(&choice, &state(), &ctx_with_elapsed(0));
        assert!(result.success);
        assert_eq!(result.target_scene, Some("gate".into()));
        assert!(result.error.is_none());
    }

    #[test]
    fn failed_conditions_surface_requirement_descriptions() {
        let mut choice = Choice::new("bribe", "Bribe the guard.").with_conditions(
            Condition::PlayerGold {
                op: CmpOp::Gte,
                value: Operand::One(50),
            },
        );
        choice.requirements.push(Requirement {
            description: "Requires 50 gold".to_string(),
            condition: Some(Condition::PlayerGold {
                op: CmpOp::Gte,
                value: Operand::One(50),
            }),
        });

        let result = processor().process(&choice, &state(), &ctx_with_elapsed(0));
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(ChoiceError::ConditionsNotMet {
                unmet: vec!["Requires 50 gold".to_string()]
            })
        );
    }

    #[test]
    fn unavailable_choice_is_rejected_after_conditions() {
        let mut choice = Choice::new("locked", "A grayed-out option.");
        choice.available = false;

        let result = processor().process(&choice, &state(), &ctx_with_elapsed(0));
        assert_eq!(result.error, Some(ChoiceError::Unavailable));
    }

    #[test]
    fn conditional_kind_rechecks_nested_condition() {
        let choice = Choice::new("whisper", "Whisper the password.");
        let mut choice = choice;
        choice.kind = ChoiceKind::Conditional {
            condition: Condition::Flag {
                key: "knows_password".to_string(),
                op: CmpOp::Eq,
                value: Some(Operand::One(FlagValue::Bool(true))),
            },
        };

        let result = processor().process(&choice, &state(), &ctx_with_elapsed(0));
        assert!(!result.success);

        let mut knowing = state();
        knowing.flags.set("knows_password", true).expect("set");
        let result = processor().process(&choice, &knowing, &ctx_with_elapsed(0));
        assert!(result.success);
    }

    #[test]
    fn timed_choice_fails_closed_after_limit() {
        let choice = Choice::new("duck", "Duck!").timed(10);

        assert!(processor()
            .process(&choice, &state(), &ctx_with_elapsed(9))
            .success);

        let expired = processor().process(&choice, &state(), &ctx_with_elapsed(10));
        assert_eq!(expired.error, Some(ChoiceError::Expired { limit_secs: 10 }));

        // Negative elapsed (clock skew) also fails closed.
        let skewed = processor().process(&choice, &state(), &ctx_with_elapsed(-1));
        assert!(!skewed.success);
    }

    #[test]
    fn preview_describes_deltas_without_touching_state() {
        let mut effect = Effect {
            health: Some(-10),
            gold: Some(25),
            ..Effect::default()
        };
        effect.relationships.push(taleweave_domain::RelationshipDelta {
            character: "elder_mira".into(),
            delta: 5,
        });
        let choice = Choice::new("help", "Help the elder.").with_effect(effect);

        let state = state();
        let before = state.clone();
        let result = processor().process(&choice, &state, &ctx_with_elapsed(0));

        assert_eq!(state, before);
        let descriptions: Vec<_> = result
            .consequences
            .iter()
            .map(|c| c.description.clone())
            .collect();
        assert_eq!(
            descriptions,
            vec!["Health -10", "Gold +25", "elder_mira +5"]
        );
    }
}
