//! `humanoid-hal` – motion and voice collaborators of the behaviour engine.
//!
//! # Modules
//!
//! - [`motion`] – the [`MotionControl`] trait: the fire-and-forget command
//!   interface leaf behaviours use to walk, stop, and play motion scripts.
//! - [`sim`] – [`SimMotion`]: an in-process motion controller that records
//!   commands and advances walk/script state one step at a time, for tests
//!   and headless runs.
//! - [`voice`] – [`spawn_speech_sink`]: consumes announce requests from the
//!   speech topic on a dedicated thread.

pub mod motion;
pub mod sim;
pub mod voice;

pub use motion::MotionControl;
pub use sim::SimMotion;
pub use voice::spawn_speech_sink;
