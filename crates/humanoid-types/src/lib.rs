use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// Commands a behaviour may issue to the motion subsystem.
/// `humanoid-hal` implementations translate these into walk-engine and
/// motion-script calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum MotionCommand {
    /// Walk in the given direction (metres per step, robot frame: +x ahead,
    /// +y to the left).
    SetDirection { x: f64, y: f64 },
    /// Turn rate while walking, in radians per step (+ is counter-clockwise).
    SetTurn { turn: f64 },
    /// Bring the walk engine to a halt.
    StopWalking,
    /// Play a named motion script (e.g. `"sit-down"`, `"kick-left"`).
    StartScript { script: String },
}

/// Most recent ball estimate in the robot's agent frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallObservation {
    pub x: f64,
    pub y: f64,
}

impl BallObservation {
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// One option that ran during a think cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RanOption {
    pub id: String,
    pub type_name: String,
}

/// The state an FSM option was left in at the end of a think cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsmStateSnapshot {
    pub fsm: String,
    pub state: String,
}

/// Behaviour-tree telemetry for a single think cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionTreeSnapshot {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    /// Options in the order their policies ran (breadth-first discovery).
    pub ran: Vec<RanOption>,
    /// `(fsm, state)` pairs for every FSM touched this cycle.
    pub fsm_states: Vec<FsmStateSnapshot>,
}

impl OptionTreeSnapshot {
    /// Ids of the options that ran, in order.
    pub fn ran_ids(&self) -> Vec<&str> {
        self.ran.iter().map(|o| o.id.as_str()).collect()
    }

    /// Current state of the FSM `fsm`, if it ran this cycle.
    pub fn state_of(&self, fsm: &str) -> Option<&str> {
        self.fsm_states
            .iter()
            .find(|s| s.fsm == fsm)
            .map(|s| s.state.as_str())
    }
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"humanoid-behavior::option_tree"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// Options run during one think cycle.
    OptionTree(OptionTreeSnapshot),
    /// Text to be spoken by the voice subsystem.
    Announce(String),
    Fault { component: String, message: String },
}

/// Error type shared by the behaviour engine and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanoidError {
    #[error("Root option already set to '{existing}', cannot also set '{attempted}'")]
    DuplicateRoot { existing: String, attempted: String },

    #[error("Option id '{0}' is already registered")]
    DuplicateOption(String),

    #[error("No option registered with id '{0}'")]
    UnknownOption(String),

    #[error("FSM '{fsm}' has no state named '{state}'")]
    UnknownState { fsm: String, state: String },

    #[error("FSM '{0}' has no start state")]
    MissingStartState(String),

    #[error("{kind} '{id}' must have at least one child")]
    EmptyComposite { kind: String, id: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Channel Error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_command_set_direction_roundtrip() {
        let cmd = MotionCommand::SetDirection { x: 0.04, y: -0.01 };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("SetDirection"));
        let back: MotionCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn snapshot_helpers() {
        let snapshot = OptionTreeSnapshot {
            cycle: 3,
            timestamp: Utc::now(),
            ran: vec![
                RanOption {
                    id: "win".to_string(),
                    type_name: "FSM".to_string(),
                },
                RanOption {
                    id: "stop-walking".to_string(),
                    type_name: "StopWalking".to_string(),
                },
            ],
            fsm_states: vec![FsmStateSnapshot {
                fsm: "win".to_string(),
                state: "ready".to_string(),
            }],
        };
        assert_eq!(snapshot.ran_ids(), vec!["win", "stop-walking"]);
        assert_eq!(snapshot.state_of("win"), Some("ready"));
        assert_eq!(snapshot.state_of("keeper"), None);
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "humanoid-behavior::fsm",
            EventPayload::Announce("playing".to_string()),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert!(matches!(back.payload, EventPayload::Announce(ref s) if s == "playing"));
    }

    #[test]
    fn ball_distance() {
        let ball = BallObservation { x: 3.0, y: 4.0 };
        assert!((ball.distance() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn humanoid_error_display() {
        let err = HumanoidError::DuplicateRoot {
            existing: "win".to_string(),
            attempted: "boot".to_string(),
        };
        assert!(err.to_string().contains("win"));
        assert!(err.to_string().contains("boot"));

        let err = HumanoidError::UnknownState {
            fsm: "keeper".to_string(),
            state: "dive".to_string(),
        };
        assert!(err.to_string().contains("keeper"));
    }
}
