//! `humanoid-middleware` – collaborator plumbing for the behaviour engine.
//!
//! Behaviours never talk to each other or to perception directly; they read
//! and write through the types in this crate.
//!
//! # Modules
//!
//! - [`state_store`] – [`StateStore`]: type-indexed, lock-protected store of
//!   the most recent value of each state object (ball estimate, option-tree
//!   telemetry, ...).  Read-many, write-rare.
//! - [`bus`] – [`EventBus`]: topic-based publish/subscribe built on Tokio
//!   broadcast channels.  Carries telemetry snapshots and announce requests
//!   for the voice subsystem.
//! - [`settings`] – [`Settings`]: live, dotted-path tunables that may change
//!   between think cycles.

pub mod bus;
pub mod settings;
pub mod state_store;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use settings::{SettingValue, Settings};
pub use state_store::StateStore;
