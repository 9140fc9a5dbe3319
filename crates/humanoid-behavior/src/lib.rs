//! `humanoid-behavior` – hierarchical option engine for the robot's decisions.
//!
//! Behaviour is a graph of [`BehaviorOption`]s evaluated once per think
//! cycle by an [`OptionTree`].  Composite options select sub-options; leaf
//! options issue motion commands and select nothing.
//!
//! # Modules
//!
//! - [`option`] – the [`BehaviorOption`] trait and the [`OptionRef`] handle.
//! - [`option_tree`] – [`OptionTree`]: option registry and breadth-first
//!   scheduler, producing an
//!   [`OptionTreeSnapshot`][humanoid_types::OptionTreeSnapshot] per cycle.
//! - [`fsm`] – [`FsmOption`]: states bound to options, guarded transitions
//!   and wildcard transitions, with a per-cycle [`TransitionWalk`] limit.
//! - [`sequence`] – [`SequenceOption`]: children one after another.
//! - [`dispatch`] – [`DispatchOption`]: one child chosen by a key.
//! - [`conditions`] – stateful combinators for transition guards.
//! - [`announcer`] – speaks entered FSM states through the voice topic.
//! - Leaves: [`ActionOption`], [`StopWalking`], [`MotionScriptOption`],
//!   [`ApproachBall`].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].
//!
//! # Threading
//!
//! The tree runs on the think thread.  Policies must not block: motion
//! commands go through [`MotionControl`][humanoid_hal::MotionControl] and
//! completion is observed on later cycles.  Options are `Send + Sync` and
//! may be shared between several parents.

pub mod action_option;
pub mod announcer;
pub mod approach_ball;
pub mod conditions;
pub mod config;
pub mod dispatch;
pub mod fsm;
pub mod motion_script;
pub mod option;
pub mod option_tree;
pub mod sequence;
pub mod stop_walking;
pub mod telemetry;
pub mod transition_walk;

pub use action_option::ActionOption;
pub use announcer::{ANNOUNCE_SETTING, Announcer};
pub use approach_ball::ApproachBall;
pub use config::BehaviorConfig;
pub use dispatch::DispatchOption;
pub use fsm::{Condition, FsmOption, FsmState, FsmTransition, StateId, StateTimer};
pub use motion_script::MotionScriptOption;
pub use option::{BehaviorOption, OptionList, OptionRef, TERMINATED, is_terminated};
pub use option_tree::OptionTree;
pub use sequence::SequenceOption;
pub use stop_walking::StopWalking;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use transition_walk::TransitionWalk;
