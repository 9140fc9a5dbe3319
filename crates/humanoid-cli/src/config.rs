//! Robot configuration – reads/writes `~/.humanoid/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use humanoid_behavior::{ANNOUNCE_SETTING, BehaviorConfig};
use humanoid_middleware::Settings;
use humanoid_types::HumanoidError;
use serde::{Deserialize, Serialize};

/// Persisted configuration stored in `~/.humanoid/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Think cycles per second.
    #[serde(default = "default_think_hz")]
    pub think_hz: u32,

    /// Transitions an FSM may take per cycle before the walk is cut off.
    #[serde(default = "default_max_transition_walk")]
    pub max_transition_walk: usize,

    /// Speak the name of every FSM state entered.
    #[serde(default)]
    pub announce_fsm_states: bool,

    /// Announcements are dropped while this many are waiting to be spoken.
    #[serde(default = "default_voice_backlog_limit")]
    pub voice_backlog_limit: usize,

    /// Free-form tunables read live by options, e.g.
    ///
    /// ```toml
    /// [settings.options.approach]
    /// speed = 0.4
    /// ```
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub settings: toml::Table,
}

fn default_think_hz() -> u32 {
    30
}
fn default_max_transition_walk() -> usize {
    humanoid_behavior::config::DEFAULT_MAX_TRANSITION_WALK
}
fn default_voice_backlog_limit() -> usize {
    humanoid_behavior::config::DEFAULT_VOICE_BACKLOG_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            think_hz: default_think_hz(),
            max_transition_walk: default_max_transition_walk(),
            announce_fsm_states: false,
            voice_backlog_limit: default_voice_backlog_limit(),
            settings: toml::Table::new(),
        }
    }
}

impl Config {
    pub fn behavior(&self) -> BehaviorConfig {
        BehaviorConfig {
            max_transition_walk: self.max_transition_walk,
            voice_backlog_limit: self.voice_backlog_limit,
        }
    }

    /// Live settings seeded from the `[settings]` table.
    /// `announce_fsm_states` is mirrored to `options.announce-fsm-states`.
    pub fn live_settings(&self) -> Settings {
        let settings = Settings::new();
        settings.merge_table(&self.settings);
        settings.set(ANNOUNCE_SETTING, self.announce_fsm_states);
        settings
    }
}

/// Return the path to `~/.humanoid/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".humanoid").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, HumanoidError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, HumanoidError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        HumanoidError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| HumanoidError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `HUMANOID_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HUMANOID_THINK_HZ` | `think_hz` |
/// | `HUMANOID_MAX_TRANSITION_WALK` | `max_transition_walk` |
/// | `HUMANOID_ANNOUNCE_FSM_STATES` | `announce_fsm_states` |
/// | `HUMANOID_VOICE_BACKLOG_LIMIT` | `voice_backlog_limit` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HUMANOID_THINK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.think_hz = hz;
    }
    if let Ok(v) = std::env::var("HUMANOID_MAX_TRANSITION_WALK")
        && let Ok(limit) = v.parse::<usize>()
    {
        cfg.max_transition_walk = limit;
    }
    if let Ok(v) = std::env::var("HUMANOID_ANNOUNCE_FSM_STATES")
        && let Ok(on) = v.parse::<bool>()
    {
        cfg.announce_fsm_states = on;
    }
    if let Ok(v) = std::env::var("HUMANOID_VOICE_BACKLOG_LIMIT")
        && let Ok(limit) = v.parse::<usize>()
    {
        cfg.voice_backlog_limit = limit;
    }
}

/// Save the config to disk, creating `~/.humanoid/` if necessary.
pub fn save(cfg: &Config) -> Result<(), HumanoidError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), HumanoidError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            HumanoidError::Config(format!("failed to create config directory: {e}"))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| HumanoidError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        HumanoidError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.think_hz, 30);
        assert_eq!(loaded.max_transition_walk, 20);
        assert!(!loaded.announce_fsm_states);
        assert_eq!(loaded.voice_backlog_limit, 2);
    }

    #[test]
    fn config_path_points_to_humanoid_dir() {
        let p = config_path_for_home("/home/robot");
        assert!(p.to_string_lossy().contains(".humanoid"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "think_hz = \"fast\"").expect("write");
        assert!(matches!(load_from(&path), Err(HumanoidError::Config(_))));
    }

    #[test]
    fn settings_table_becomes_live_settings() {
        let cfg: Config = toml::from_str(
            r#"
            announce_fsm_states = true

            [settings.options.approach]
            speed = 0.4
            stop-distance = 0.25
            "#,
        )
        .expect("valid config");

        let settings = cfg.live_settings();
        assert_eq!(settings.get_f64("options.approach.speed", 0.0), 0.4);
        assert_eq!(settings.get_f64("options.approach.stop-distance", 0.0), 0.25);
        assert!(settings.get_bool(ANNOUNCE_SETTING, false));
    }

    #[test]
    fn behavior_config_mirrors_fields() {
        let cfg = Config {
            max_transition_walk: 7,
            voice_backlog_limit: 4,
            ..Config::default()
        };
        assert_eq!(
            cfg.behavior(),
            BehaviorConfig {
                max_transition_walk: 7,
                voice_backlog_limit: 4,
            }
        );
    }

    #[test]
    fn apply_env_overrides_changes_fields() {
        // SAFETY: only this test touches these variables.
        unsafe {
            std::env::set_var("HUMANOID_THINK_HZ", "60");
            std::env::set_var("HUMANOID_ANNOUNCE_FSM_STATES", "true");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.think_hz, 60);
        assert!(cfg.announce_fsm_states);
        unsafe {
            std::env::remove_var("HUMANOID_THINK_HZ");
            std::env::remove_var("HUMANOID_ANNOUNCE_FSM_STATES");
        }
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_values() {
        // SAFETY: only this test touches this variable.
        unsafe { std::env::set_var("HUMANOID_VOICE_BACKLOG_LIMIT", "lots") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.voice_backlog_limit, 2);
        unsafe { std::env::remove_var("HUMANOID_VOICE_BACKLOG_LIMIT") };
    }
}
