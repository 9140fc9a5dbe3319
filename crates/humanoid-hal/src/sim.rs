//! In-process simulated motion controller for tests and headless runs.
//!
//! [`SimMotion`] records every accepted [`MotionCommand`] and models just
//! enough of the real motion thread for behaviours to observe completion:
//! a stop request takes one [`step`][SimMotion::step] to settle, and a motion
//! script plays for a configurable number of steps.
//!
//! # Example
//!
//! ```rust
//! use humanoid_hal::{MotionControl, SimMotion};
//! use humanoid_types::MotionCommand;
//!
//! let motion = SimMotion::new().with_script_steps(2);
//! assert!(motion.submit(MotionCommand::StartScript { script: "sit-down".into() }));
//! assert!(motion.is_script_running());
//!
//! motion.step();
//! motion.step();
//! assert!(!motion.is_script_running());
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use humanoid_types::MotionCommand;
use tracing::debug;

use crate::motion::MotionControl;

const DEFAULT_SCRIPT_STEPS: u32 = 3;

#[derive(Debug, Default)]
struct SimState {
    commands: Vec<MotionCommand>,
    walking: bool,
    stopping: bool,
    direction: (f64, f64),
    turn: f64,
    script: Option<(String, u32)>,
}

/// A simulated motion controller. Always available; never faults.
#[derive(Debug)]
pub struct SimMotion {
    script_steps: u32,
    state: Mutex<SimState>,
}

impl SimMotion {
    pub fn new() -> Self {
        Self {
            script_steps: DEFAULT_SCRIPT_STEPS,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Number of [`step`][Self::step] calls a motion script takes to finish.
    pub fn with_script_steps(mut self, steps: u32) -> Self {
        self.script_steps = steps;
        self
    }

    /// Advance the simulated motion thread by one tick.
    pub fn step(&self) {
        let mut state = self.lock();
        if state.stopping {
            state.stopping = false;
            state.walking = false;
            state.direction = (0.0, 0.0);
            state.turn = 0.0;
            debug!("sim walk stopped");
        }
        let finished = match state.script.as_mut() {
            Some((_, remaining)) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if finished && let Some((name, _)) = state.script.take() {
            debug!(script = %name, "sim script finished");
        }
    }

    /// Every accepted command, oldest first.
    pub fn commands(&self) -> Vec<MotionCommand> {
        self.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<MotionCommand> {
        self.lock().commands.last().cloned()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    pub fn direction(&self) -> (f64, f64) {
        self.lock().direction
    }

    pub fn active_script(&self) -> Option<String> {
        self.lock().script.as_ref().map(|(name, _)| name.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionControl for SimMotion {
    fn submit(&self, command: MotionCommand) -> bool {
        let mut state = self.lock();
        let accepted = match &command {
            MotionCommand::SetDirection { x, y } => {
                if state.script.is_some() {
                    false
                } else {
                    state.walking = true;
                    state.stopping = false;
                    state.direction = (*x, *y);
                    true
                }
            }
            MotionCommand::SetTurn { turn } => {
                state.turn = *turn;
                true
            }
            MotionCommand::StopWalking => {
                if state.walking {
                    state.stopping = true;
                }
                true
            }
            MotionCommand::StartScript { script } => {
                if state.script.is_some() {
                    false
                } else {
                    state.walking = false;
                    state.stopping = false;
                    state.script = Some((script.clone(), self.script_steps.max(1)));
                    true
                }
            }
        };
        if accepted {
            state.commands.push(command);
        } else {
            debug!(?command, "sim motion refused command");
        }
        accepted
    }

    fn is_walking(&self) -> bool {
        self.lock().walking
    }

    fn is_script_running(&self) -> bool {
        self.lock().script.is_some()
    }
}
