//! Generic `MotionControl` trait for walk engines and motion-script players.
//!
//! The motion subsystem runs on its own thread; behaviours only ever submit
//! commands and poll status, so a call here never blocks the think cycle.
//! Completion of a command is observed on a later cycle through
//! [`MotionControl::is_walking`] / [`MotionControl::is_script_running`].

use humanoid_types::MotionCommand;

pub trait MotionControl: Send + Sync {
    /// Queue `command` for the motion thread.
    ///
    /// Returns `false` when the command was refused, e.g. a script start
    /// while another script still owns the body.
    fn submit(&self, command: MotionCommand) -> bool;

    /// `true` while the walk engine is moving (including while it winds down
    /// after a stop request).
    fn is_walking(&self) -> bool;

    /// `true` while a motion script is playing.
    fn is_script_running(&self) -> bool;
}
