//! [`Settings`] – live tunables addressed by dotted path.
//!
//! Behaviours read parameters such as `options.approach.speed` every cycle,
//! so a value changed from the CLI or a config reload takes effect on the
//! next think cycle without rebuilding the behaviour graph.
//!
//! Values are loaded from a TOML table whose nested tables are flattened
//! into dotted paths:
//!
//! ```
//! use humanoid_middleware::Settings;
//!
//! let settings = Settings::from_toml_str(r#"
//!     [options]
//!     announce-fsm-states = true
//!     [options.approach]
//!     speed = 0.6
//! "#).unwrap();
//!
//! assert!(settings.get_bool("options.announce-fsm-states", false));
//! assert_eq!(settings.get_f64("options.approach.speed", 0.0), 0.6);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use humanoid_types::HumanoidError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single tunable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

/// Shared settings store. Clones see each other's updates.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: Arc<RwLock<BTreeMap<String, SettingValue>>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and flatten it into dotted paths.
    ///
    /// # Errors
    ///
    /// Returns [`HumanoidError::Config`] when the document is not valid TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, HumanoidError> {
        let table: toml::Table = toml::from_str(raw)
            .map_err(|e| HumanoidError::Config(format!("failed to parse settings: {e}")))?;
        let settings = Self::new();
        settings.merge_table(&table);
        Ok(settings)
    }

    /// Merge every leaf of `table` into the store, overwriting existing paths.
    pub fn merge_table(&self, table: &toml::Table) {
        let mut flat = BTreeMap::new();
        flatten_into("", table, &mut flat);
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.extend(flat);
    }

    pub fn set(&self, path: impl Into<String>, value: impl Into<SettingValue>) {
        let path = path.into();
        let value = value.into();
        debug!(%path, ?value, "setting changed");
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, value);
    }

    pub fn get(&self, path: &str) -> Option<SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Boolean at `path`, or `default` when absent or of another type.
    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        match self.get(path) {
            Some(SettingValue::Bool(v)) => v,
            None => default,
            Some(other) => {
                warn!(%path, ?other, "setting is not a bool; using default");
                default
            }
        }
    }

    /// Number at `path` (integers are widened), or `default`.
    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        match self.get(path) {
            Some(SettingValue::Float(v)) => v,
            Some(SettingValue::Int(v)) => v as f64,
            None => default,
            Some(other) => {
                warn!(%path, ?other, "setting is not numeric; using default");
                default
            }
        }
    }

    pub fn get_str(&self, path: &str, default: &str) -> String {
        match self.get(path) {
            Some(SettingValue::Text(v)) => v,
            _ => default.to_string(),
        }
    }

    /// All dotted paths currently stored, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

fn flatten_into(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, SettingValue>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(&path, inner, out),
            toml::Value::Boolean(b) => {
                out.insert(path, SettingValue::Bool(*b));
            }
            toml::Value::Integer(i) => {
                out.insert(path, SettingValue::Int(*i));
            }
            toml::Value::Float(f) => {
                out.insert(path, SettingValue::Float(*f));
            }
            toml::Value::String(s) => {
                out.insert(path, SettingValue::Text(s.clone()));
            }
            other => warn!(%path, kind = other.type_str(), "unsupported setting type; skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tables_flatten_to_dotted_paths() {
        let settings = Settings::from_toml_str(
            r#"
            think-hz = 30
            [options.approach]
            speed = 0.5
            name = "striker"
            "#,
        )
        .expect("valid toml");
        assert_eq!(
            settings.paths(),
            vec![
                "options.approach.name".to_string(),
                "options.approach.speed".to_string(),
                "think-hz".to_string(),
            ]
        );
        assert_eq!(settings.get_str("options.approach.name", ""), "striker");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let result = Settings::from_toml_str("[[[");
        assert!(matches!(result, Err(HumanoidError::Config(_))));
    }

    #[test]
    fn missing_paths_use_default() {
        let settings = Settings::new();
        assert!(settings.get_bool("options.announce-fsm-states", true));
        assert_eq!(settings.get_f64("options.approach.speed", 0.25), 0.25);
        assert_eq!(settings.get_str("agent.name", "bold"), "bold");
    }

    #[test]
    fn integers_widen_to_f64() {
        let settings = Settings::new();
        settings.set("walk.max-speed", 2_i64);
        assert_eq!(settings.get_f64("walk.max-speed", 0.0), 2.0);
    }

    #[test]
    fn wrong_type_falls_back_to_default() {
        let settings = Settings::new();
        settings.set("options.announce-fsm-states", "yes");
        assert!(!settings.get_bool("options.announce-fsm-states", false));
    }

    #[test]
    fn clones_observe_live_updates() {
        let settings = Settings::new();
        let reader = settings.clone();
        settings.set("options.approach.speed", 0.1);
        assert_eq!(reader.get_f64("options.approach.speed", 0.0), 0.1);
        settings.set("options.approach.speed", 0.9);
        assert_eq!(reader.get_f64("options.approach.speed", 0.0), 0.9);
    }
}
