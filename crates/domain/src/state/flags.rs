//! Typed game flags.
//!
//! Flags are named, persistent pieces of state used to gate and branch
//! narrative content. Values are tagged (`Bool` / `Number` / `Text`) and
//! validated at write time; comparisons never coerce across types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A typed flag value.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FlagValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "bool",
            FlagValue::Number(_) => "number",
            FlagValue::Text(_) => "text",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlagValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlagValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Number(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Number(value as f64)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Text(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Text(value)
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagValue::Bool(v) => write!(f, "{}", v),
            FlagValue::Number(v) => write!(f, "{}", v),
            FlagValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// The flag store: a sorted map from flag key to typed value.
///
/// Writing a value of a different type than an existing flag replaces the
/// flag wholesale; there is no implicit conversion in either direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagMap {
    entries: BTreeMap<String, FlagValue>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag. Keys must be non-empty.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FlagValue>,
    ) -> Result<(), DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::validation("flag key cannot be empty"));
        }
        self.entries.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FlagValue> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlagValue)> {
        self.entries.iter()
    }

    /// Keys starting with `prefix`, in sorted order.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_typed_values() {
        let mut flags = FlagMap::new();
        flags.set("met_wizard", true).expect("set");
        flags.set("gold_owed", 12.5).expect("set");
        flags.set("last_town", "riverhollow").expect("set");

        assert_eq!(flags.get("met_wizard").and_then(FlagValue::as_bool), Some(true));
        assert_eq!(flags.get("gold_owed").and_then(FlagValue::as_number), Some(12.5));
        assert_eq!(
            flags.get("last_town").and_then(FlagValue::as_text),
            Some("riverhollow")
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut flags = FlagMap::new();
        assert!(flags.set("  ", true).is_err());
    }

    #[test]
    fn rewrite_replaces_type() {
        let mut flags = FlagMap::new();
        flags.set("door", true).expect("set");
        flags.set("door", "locked").expect("set");
        assert_eq!(flags.get("door").map(FlagValue::type_name), Some("text"));
    }

    #[test]
    fn prefix_scan_returns_sorted_keys() {
        let mut flags = FlagMap::new();
        flags.set("status.curse.frailty", true).expect("set");
        flags.set("status.blessing.vigor", true).expect("set");
        flags.set("met_wizard", true).expect("set");

        let keys: Vec<_> = flags.keys_with_prefix("status.").cloned().collect();
        assert_eq!(keys, vec!["status.blessing.vigor", "status.curse.frailty"]);
    }

    #[test]
    fn serde_round_trips_as_plain_map() {
        let mut flags = FlagMap::new();
        flags.set("met_wizard", true).expect("set");
        flags.set("debt", 10.0).expect("set");

        let json = serde_json::to_string(&flags).expect("serialize");
        assert_eq!(json, r#"{"debt":10.0,"met_wizard":true}"#);
        let back: FlagMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, flags);
    }
}
