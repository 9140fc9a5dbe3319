//! Engine tunables shared by every FSM in a behaviour graph.

use serde::{Deserialize, Serialize};

/// Default cap on transitions an FSM may take within one think cycle.
pub const DEFAULT_MAX_TRANSITION_WALK: usize = 20;

/// Default number of queued announcements above which new ones are dropped.
pub const DEFAULT_VOICE_BACKLOG_LIMIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Transitions an FSM may take per cycle before the walk is cut off and
    /// an error is logged.
    #[serde(default = "default_max_transition_walk")]
    pub max_transition_walk: usize,

    /// Announcements are only queued while fewer than this many are waiting
    /// to be spoken.
    #[serde(default = "default_voice_backlog_limit")]
    pub voice_backlog_limit: usize,
}

fn default_max_transition_walk() -> usize {
    DEFAULT_MAX_TRANSITION_WALK
}

fn default_voice_backlog_limit() -> usize {
    DEFAULT_VOICE_BACKLOG_LIMIT
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_transition_walk: default_max_transition_walk(),
            voice_backlog_limit: default_voice_backlog_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: BehaviorConfig = toml::from_str("").expect("empty document is valid");
        assert_eq!(cfg, BehaviorConfig::default());
        assert_eq!(cfg.max_transition_walk, 20);
        assert_eq!(cfg.voice_backlog_limit, 2);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg: BehaviorConfig =
            toml::from_str("max_transition_walk = 5").expect("valid document");
        assert_eq!(cfg.max_transition_walk, 5);
        assert_eq!(cfg.voice_backlog_limit, DEFAULT_VOICE_BACKLOG_LIMIT);
    }
}
