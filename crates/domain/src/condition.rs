//! Condition trees and their evaluator.
//!
//! A condition is a boolean predicate tree over game state: `all` / `any` /
//! `not` combinators over child nodes, with leaf predicates keyed to a fixed
//! set of recognized state lookups. Evaluation is pure and total - a
//! condition that deserialized successfully always evaluates to a definite
//! boolean. Unrecognized predicate keys never reach evaluation: the tagged
//! representation rejects them at content load, so a malformed condition is
//! an authoring error, not a silent deny.
//!
//! Vacuous semantics are pinned down explicitly: an absent condition passes,
//! an empty `all` passes, an empty `any` fails.

use serde::{Deserialize, Serialize};

use crate::game_time::TimeOfDay;
use crate::ids::{AchievementId, CharacterId, ChoiceId, ItemId, SceneId};
use crate::state::{FlagValue, GameState};

// =============================================================================
// Comparison operators
// =============================================================================

/// Comparison operator carried by comparing leaf predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "ne")]
    Ne,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    Nin,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "nexists")]
    NotExists,
}

/// Operand of a comparing leaf: a single value or a list (for `in` / `nin`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand<T> {
    One(T),
    Many(Vec<T>),
}

/// Compare `actual` against the operand under `op`.
///
/// `In`/`Nin` against a single value degrade to equality; ordering operators
/// against a list have no sensible reading and evaluate false. `Exists` /
/// `NotExists` are presence checks on the flag store and are resolved before
/// this function; on always-present stats they are trivially true / false.
fn compare<T: PartialOrd>(op: CmpOp, actual: &T, operand: &Operand<T>) -> bool {
    match (op, operand) {
        (CmpOp::Eq, Operand::One(v)) => actual == v,
        (CmpOp::Ne, Operand::One(v)) => actual != v,
        (CmpOp::Gt, Operand::One(v)) => actual > v,
        (CmpOp::Gte, Operand::One(v)) => actual >= v,
        (CmpOp::Lt, Operand::One(v)) => actual < v,
        (CmpOp::Lte, Operand::One(v)) => actual <= v,
        (CmpOp::In, Operand::Many(vs)) => vs.iter().any(|v| v == actual),
        (CmpOp::Nin, Operand::Many(vs)) => !vs.iter().any(|v| v == actual),
        (CmpOp::In, Operand::One(v)) => actual == v,
        (CmpOp::Nin, Operand::One(v)) => actual != v,
        (CmpOp::Exists, _) => true,
        (CmpOp::NotExists, _) => false,
        // Ordering against a list
        (_, Operand::Many(_)) => false,
    }
}

// =============================================================================
// Condition tree
// =============================================================================

/// A boolean predicate tree over game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Condition {
    // Combinators
    /// All children must pass. Empty list passes.
    All { conditions: Vec<Condition> },
    /// At least one child must pass. Empty list fails.
    Any { conditions: Vec<Condition> },
    /// Child must fail.
    Not { condition: Box<Condition> },

    // Leaf predicates
    PlayerLevel { op: CmpOp, value: Operand<i64> },
    PlayerHealth { op: CmpOp, value: Operand<i64> },
    PlayerGold { op: CmpOp, value: Operand<i64> },
    /// Typed flag comparison. `exists` / `nexists` check key presence and
    /// ignore `value`; other operators require it.
    Flag {
        key: String,
        op: CmpOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Operand<FlagValue>>,
    },
    /// At least one of the item is held.
    HasItem { item: ItemId },
    ItemCount { item: ItemId, op: CmpOp, value: Operand<i64> },
    SceneVisited { scene: SceneId },
    Relationship {
        character: CharacterId,
        op: CmpOp,
        value: Operand<i64>,
    },
    AchievementUnlocked { achievement: AchievementId },
    /// Cumulative playtime in seconds.
    Playtime { op: CmpOp, value: Operand<i64> },
    /// The choice appears anywhere in the player's history.
    ChoiceMade { choice: ChoiceId },
    TimeOfDay { period: TimeOfDay },
    /// Story-progress percentage in [0, 100].
    StoryProgress { op: CmpOp, value: Operand<f64> },
}

/// Ambient inputs the evaluator needs beyond game state.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub time_of_day: TimeOfDay,
}

impl Condition {
    pub fn evaluate(&self, state: &GameState, ctx: &EvalContext) -> bool {
        evaluate(self, state, ctx)
    }
}

/// Evaluate a condition tree against game state. Pure; combinators
/// short-circuit left to right.
pub fn evaluate(condition: &Condition, state: &GameState, ctx: &EvalContext) -> bool {
    match condition {
        Condition::All { conditions } => conditions.iter().all(|c| evaluate(c, state, ctx)),
        Condition::Any { conditions } => conditions.iter().any(|c| evaluate(c, state, ctx)),
        Condition::Not { condition } => !evaluate(condition, state, ctx),

        Condition::PlayerLevel { op, value } => {
            compare(*op, &i64::from(state.player.level()), value)
        }
        Condition::PlayerHealth { op, value } => compare(*op, &state.player.health(), value),
        Condition::PlayerGold { op, value } => compare(*op, &state.player.gold(), value),

        Condition::Flag { key, op, value } => evaluate_flag(state, key, *op, value.as_ref()),

        Condition::HasItem { item } => state.inventory.has(item),
        Condition::ItemCount { item, op, value } => {
            compare(*op, &i64::from(state.inventory.count(item)), value)
        }

        Condition::SceneVisited { scene } => state.progress.has_visited(scene),
        Condition::Relationship {
            character,
            op,
            value,
        } => compare(*op, &i64::from(state.relationships.score(character)), value),
        Condition::AchievementUnlocked { achievement } => {
            state.progress.has_achievement(achievement)
        }
        Condition::Playtime { op, value } => {
            let seconds = i64::try_from(state.progress.playtime_seconds()).unwrap_or(i64::MAX);
            compare(*op, &seconds, value)
        }
        Condition::ChoiceMade { choice } => state.progress.has_made_choice(choice),
        Condition::TimeOfDay { period } => ctx.time_of_day == *period,
        Condition::StoryProgress { op, value } => {
            compare(*op, &state.progress.story_progress(), value)
        }
    }
}

/// Absent conditions pass vacuously.
pub fn evaluate_opt(condition: Option<&Condition>, state: &GameState, ctx: &EvalContext) -> bool {
    condition.map_or(true, |c| evaluate(c, state, ctx))
}

/// Typed flag comparison: presence operators check the key; comparing
/// operators require an operand and never coerce across value types -
/// ordering is numeric-only, and a type mismatch is simply unmet.
fn evaluate_flag(
    state: &GameState,
    key: &str,
    op: CmpOp,
    operand: Option<&Operand<FlagValue>>,
) -> bool {
    match op {
        CmpOp::Exists => return state.flags.contains(key),
        CmpOp::NotExists => return !state.flags.contains(key),
        _ => {}
    }

    let (Some(actual), Some(operand)) = (state.flags.get(key), operand) else {
        return false;
    };

    match op {
        CmpOp::Eq | CmpOp::Ne | CmpOp::In | CmpOp::Nin => compare(op, actual, operand),
        CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte => {
            let (Some(actual), Some(expected)) = (actual.as_number(), operand_number(operand))
            else {
                return false;
            };
            compare(op, &actual, &expected)
        }
        CmpOp::Exists | CmpOp::NotExists => unreachable!("handled above"),
    }
}

fn operand_number(operand: &Operand<FlagValue>) -> Option<Operand<f64>> {
    match operand {
        Operand::One(v) => v.as_number().map(Operand::One),
        Operand::Many(vs) => vs
            .iter()
            .map(FlagValue::as_number)
            .collect::<Option<Vec<_>>>()
            .map(Operand::Many),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Item, ItemKind};
    use crate::state::GameSettings;
    use chrono::{TimeZone, Utc};

    fn ctx() -> EvalContext {
        EvalContext {
            time_of_day: TimeOfDay::Morning,
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

    #[test]
    fn empty_all_passes_empty_any_fails() {
        let state = state();
        assert!(evaluate(
            &Condition::All { conditions: vec![] },
            &state,
            &ctx()
        ));
        assert!(!evaluate(
            &Condition::Any { conditions: vec![] },
            &state,
            &ctx()
        ));
    }

    #[test]
    fn absent_condition_passes_vacuously() {
        assert!(evaluate_opt(None, &state(), &ctx()));
    }

    #[test]
    fn level_and_flag_conjunction() {
        // all[playerLevel >= 5, flag met_wizard == true]
        let condition = Condition::All {
            conditions: vec![
                Condition::PlayerLevel {
                    op: CmpOp::Gte,
                    value: Operand::One(5),
                },
                Condition::Flag {
                    key: "met_wizard".to_string(),
                    op: CmpOp::Eq,
                    value: Some(Operand::One(FlagValue::Bool(true))),
                },
            ],
        };

        let mut state = state();
        state.flags.set("met_wizard", true).expect("set");
        state.player.add_experience(1600); // level 5
        assert_eq!(state.player.level(), 5);
        assert!(condition.evaluate(&state, &ctx()));

        let mut below = self::state();
        below.flags.set("met_wizard", true).expect("set");
        below.player.add_experience(900); // level 4
        assert_eq!(below.player.level(), 4);
        assert!(!condition.evaluate(&below, &ctx()));
    }

    #[test]
    fn not_inverts() {
        let condition = Condition::Not {
            condition: Box::new(Condition::Any { conditions: vec![] }),
        };
        assert!(condition.evaluate(&state(), &ctx()));
    }

    #[test]
    fn flag_type_mismatch_is_unmet_not_coerced() {
        let mut state = state();
        state.flags.set("count", 1.0).expect("set");

        let as_bool = Condition::Flag {
            key: "count".to_string(),
            op: CmpOp::Eq,
            value: Some(Operand::One(FlagValue::Bool(true))),
        };
        assert!(!as_bool.evaluate(&state, &ctx()));
    }

    #[test]
    fn flag_exists_ignores_operand() {
        let mut state = state();
        state.flags.set("met_wizard", true).expect("set");

        let exists = Condition::Flag {
            key: "met_wizard".to_string(),
            op: CmpOp::Exists,
            value: None,
        };
        let missing = Condition::Flag {
            key: "met_dragon".to_string(),
            op: CmpOp::NotExists,
            value: None,
        };
        assert!(exists.evaluate(&state, &ctx()));
        assert!(missing.evaluate(&state, &ctx()));
    }

    #[test]
    fn flag_numeric_ordering() {
        let mut state = state();
        state.flags.set("debt", 40.0).expect("set");

        let condition = Condition::Flag {
            key: "debt".to_string(),
            op: CmpOp::Lt,
            value: Some(Operand::One(FlagValue::Number(50.0))),
        };
        assert!(condition.evaluate(&state, &ctx()));
    }

    #[test]
    fn in_operator_matches_lists() {
        let mut state = state();
        state.flags.set("town", "riverhollow").expect("set");

        let condition = Condition::Flag {
            key: "town".to_string(),
            op: CmpOp::In,
            value: Some(Operand::Many(vec![
                FlagValue::Text("riverhollow".to_string()),
                FlagValue::Text("duskmere".to_string()),
            ])),
        };
        assert!(condition.evaluate(&state, &ctx()));
    }

    #[test]
    fn inventory_membership_and_count() {
        let mut state = state();
        let herb = Item::new("herb", "Moonpetal Herb", ItemKind::Misc).stackable(10);
        state
            .inventory
            .add(herb, 3, Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap())
            .expect("add");

        assert!(Condition::HasItem {
            item: "herb".into()
        }
        .evaluate(&state, &ctx()));
        assert!(Condition::ItemCount {
            item: "herb".into(),
            op: CmpOp::Gte,
            value: Operand::One(3),
        }
        .evaluate(&state, &ctx()));
        assert!(!Condition::ItemCount {
            item: "herb".into(),
            op: CmpOp::Gt,
            value: Operand::One(3),
        }
        .evaluate(&state, &ctx()));
    }

    #[test]
    fn time_of_day_comes_from_context() {
        let condition = Condition::TimeOfDay {
            period: TimeOfDay::Night,
        };
        assert!(!condition.evaluate(&state(), &ctx()));
        assert!(condition.evaluate(
            &state(),
            &EvalContext {
                time_of_day: TimeOfDay::Night
            }
        ));
    }

    #[test]
    fn short_circuit_stops_at_first_failure() {
        // The second child would pass, but `any` short-circuits on the first
        // success; conversely `all` stops at the first failure. Verified
        // indirectly: evaluation of a deep tree terminates with the expected
        // result.
        let condition = Condition::Any {
            conditions: vec![
                Condition::All { conditions: vec![] },
                Condition::PlayerGold {
                    op: CmpOp::Gte,
                    value: Operand::One(1_000_000),
                },
            ],
        };
        assert!(condition.evaluate(&state(), &ctx()));
    }

    #[test]
    fn unknown_predicate_key_fails_at_load() {
        let result: Result<Condition, _> = serde_json::from_str(
            r#"{"type":"moonPhase","op":"eq","value":3}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn condition_serde_round_trips() {
        let condition = Condition::All {
            conditions: vec![
                Condition::PlayerLevel {
                    op: CmpOp::Gte,
                    value: Operand::One(5),
                },
                Condition::Flag {
                    key: "met_wizard".to_string(),
                    op: CmpOp::Eq,
                    value: Some(Operand::One(FlagValue::Bool(true))),
                },
            ],
        };
        let json = serde_json::to_string(&condition).expect("serialize");
        let back: Condition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, condition);
    }
}
