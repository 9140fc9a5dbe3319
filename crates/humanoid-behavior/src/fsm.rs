//! Finite-state-machine option.
//!
//! An [`FsmOption`] is a directed graph whose nodes are [`FsmState`]s, each
//! bound to the options that run while it is active, and whose edges are
//! [`FsmTransition`]s guarded by conditions.  Each think cycle
//! [`run_policy`][BehaviorOption::run_policy]:
//!
//! 1. enters the start state if no state is current yet;
//! 2. evaluates wildcard transitions, then the current state's own
//!    transitions, each in registration order, and takes the first whose
//!    condition holds;
//! 3. repeats step 2 until no transition fires, or until the
//!    [`TransitionWalk`] limit is reached (an error is logged);
//! 4. returns the options of the state it ended in.
//!
//! Wildcard transitions are checked against every state and before the local
//! ones, so cross-cutting events such as "fell over" always preempt
//! state-specific logic.
//!
//! States live in an arena inside the FSM and are addressed by [`StateId`],
//! so transitions never hold references to each other.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use humanoid_behavior::{BehaviorOption, FsmOption};
//! use humanoid_types::SystemClock;
//!
//! let ball_visible = Arc::new(AtomicBool::new(false));
//!
//! let mut fsm = FsmOption::new("play", Arc::new(SystemClock));
//! let idle = fsm.new_start_state("idle", vec![]);
//! let active = fsm.new_state("active", vec![]);
//! let seen = Arc::clone(&ball_visible);
//! fsm.transition(idle, active)
//!     .named("ball-seen")
//!     .when(move || seen.load(Ordering::Relaxed));
//!
//! fsm.run_policy();
//! assert_eq!(fsm.current_state_name().as_deref(), Some("idle"));
//!
//! ball_visible.store(true, Ordering::Relaxed);
//! fsm.run_policy();
//! assert_eq!(fsm.current_state_name().as_deref(), Some("active"));
//! ```

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use humanoid_types::{Clock, HumanoidError};
use tracing::{debug, error, info, trace, warn};

use crate::announcer::Announcer;
use crate::config::BehaviorConfig;
use crate::option::{BehaviorOption, OptionList, is_terminated};
use crate::transition_walk::TransitionWalk;

/// Zero-argument predicate evaluated fresh every time a transition is checked.
pub type Condition = Box<dyn Fn() -> bool + Send + Sync>;

/// Side-effect hook run on state entry or when a transition fires.
pub type Callback = Box<dyn Fn() + Send + Sync>;

/// Handle to a state of one [`FsmOption`].
///
/// Ids are only meaningful to the FSM that created them.  Passing one to a
/// different FSM trips a debug assertion; release builds address whatever
/// state sits at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId {
    fsm: u64,
    index: usize,
}

static NEXT_FSM_TAG: AtomicU64 = AtomicU64::new(0);

// ─────────────────────────────────────────────────────────────────────────────
// FsmState
// ─────────────────────────────────────────────────────────────────────────────

pub struct FsmState {
    name: String,
    options: OptionList,
    is_start: bool,
    is_final: bool,
    on_enter: Vec<Callback>,
    entered_at: Arc<Mutex<Option<Instant>>>,
    transitions: Vec<FsmTransition>,
}

impl FsmState {
    fn new(name: String, options: OptionList) -> Self {
        Self {
            name,
            options,
            is_start: false,
            is_final: false,
            on_enter: Vec::new(),
            entered_at: Arc::new(Mutex::new(None)),
            transitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn transitions(&self) -> &[FsmTransition] {
        &self.transitions
    }

    /// When this state was last entered, if ever.
    pub fn entered_at(&self) -> Option<Instant> {
        *self.entered_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` when every option bound to this state reports termination.
    pub fn all_options_terminated(&self) -> bool {
        self.options.iter().all(|o| is_terminated(o.as_ref()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FsmTransition
// ─────────────────────────────────────────────────────────────────────────────

pub struct FsmTransition {
    name: Option<String>,
    /// `None` for wildcard transitions.
    from: Option<StateId>,
    to: StateId,
    /// Options of the source state, for [`when_terminated`][Self::when_terminated].
    source_options: OptionList,
    condition: Option<Condition>,
    on_fire: Option<Callback>,
}

impl FsmTransition {
    fn new(from: Option<StateId>, to: StateId, source_options: OptionList) -> Self {
        Self {
            name: None,
            from,
            to,
            source_options,
            condition: None,
            on_fire: None,
        }
    }

    /// Label shown in logs and in [`FsmOption::to_dot`].
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Guard the transition with `condition`.  A transition without a
    /// condition fires whenever it is checked.
    pub fn when<F>(&mut self, condition: F) -> &mut Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Fire once every option of the source state has terminated.
    ///
    /// Wildcard transitions have no source state; for them this guard never
    /// fires.
    pub fn when_terminated(&mut self) -> &mut Self {
        if self.from.is_none() {
            warn!("when_terminated() on a wildcard transition never fires");
            return self.when(|| false);
        }
        let options = self.source_options.clone();
        self.when(move || options.iter().all(|o| is_terminated(o.as_ref())))
    }

    /// Run `callback` exactly once each time this transition is taken, after
    /// the target state has been entered.
    pub fn on_fire<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_fire = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn from(&self) -> Option<StateId> {
        self.from
    }

    pub fn to(&self) -> StateId {
        self.to
    }

    pub fn is_wildcard(&self) -> bool {
        self.from.is_none()
    }

    fn is_satisfied(&self) -> bool {
        self.condition.as_ref().is_none_or(|condition| condition())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StateTimer
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only handle on a state's entry time, for use inside conditions.
#[derive(Clone)]
pub struct StateTimer {
    entered_at: Arc<Mutex<Option<Instant>>>,
    clock: Arc<dyn Clock>,
}

impl StateTimer {
    /// Time since the state was last entered; zero if it never was.
    pub fn elapsed(&self) -> Duration {
        match *self.entered_at.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(at) => self.clock.since(at),
            None => Duration::ZERO,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FsmOption
// ─────────────────────────────────────────────────────────────────────────────

pub struct FsmOption {
    id: String,
    tag: u64,
    states: Vec<FsmState>,
    wildcard_transitions: Vec<FsmTransition>,
    start: Option<StateId>,
    current: Mutex<Option<StateId>>,
    clock: Arc<dyn Clock>,
    announcer: Option<Announcer>,
    max_transition_walk: usize,
}

impl FsmOption {
    pub fn new(id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: id.into(),
            tag: NEXT_FSM_TAG.fetch_add(1, Ordering::Relaxed),
            states: Vec::new(),
            wildcard_transitions: Vec::new(),
            start: None,
            current: Mutex::new(None),
            clock,
            announcer: None,
            max_transition_walk: BehaviorConfig::default().max_transition_walk,
        }
    }

    pub fn with_config(mut self, config: &BehaviorConfig) -> Self {
        self.max_transition_walk = config.max_transition_walk;
        self
    }

    /// Speak state names on entry, subject to the announcer's setting.
    pub fn with_announcer(mut self, announcer: Announcer) -> Self {
        self.announcer = Some(announcer);
        self
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Add a state running `options` while active.
    pub fn new_state(&mut self, name: impl Into<String>, options: OptionList) -> StateId {
        let name = name.into();
        if self.state_id(&name).is_some() {
            warn!(fsm = %self.id, state = %name, "duplicate state name; lookups by name find the first");
        }
        let id = StateId {
            fsm: self.tag,
            index: self.states.len(),
        };
        self.states.push(FsmState::new(name, options));
        id
    }

    /// Add the state the FSM enters on its first run.  Replaces any earlier
    /// start state.
    pub fn new_start_state(&mut self, name: impl Into<String>, options: OptionList) -> StateId {
        let id = self.new_state(name, options);
        if let Some(previous) = self.start.replace(id) {
            warn!(
                fsm = %self.id,
                previous = %self.states[self.slot(previous)].name,
                start = %self.states[self.slot(id)].name,
                "start state replaced"
            );
            let previous = self.slot(previous);
            self.states[previous].is_start = false;
        }
        let slot = self.slot(id);
        self.states[slot].is_start = true;
        id
    }

    /// Add a state in which the FSM reports itself terminated.
    pub fn new_final_state(&mut self, name: impl Into<String>, options: OptionList) -> StateId {
        let id = self.new_state(name, options);
        let slot = self.slot(id);
        self.states[slot].is_final = true;
        id
    }

    /// Run `callback` every time `state` is entered.
    pub fn on_enter<F>(&mut self, state: StateId, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let slot = self.slot(state);
        self.states[slot].on_enter.push(Box::new(callback));
    }

    /// Add a transition from `from` to `to`, checked while `from` is current.
    pub fn transition(&mut self, from: StateId, to: StateId) -> &mut FsmTransition {
        let slot = self.slot(from);
        self.slot(to);
        let source_options = self.states[slot].options.clone();
        let transitions = &mut self.states[slot].transitions;
        transitions.push(FsmTransition::new(Some(from), to, source_options));
        let last = transitions.len() - 1;
        &mut transitions[last]
    }

    /// Add a transition to `target` resolved by name.
    ///
    /// # Errors
    ///
    /// Returns [`HumanoidError::UnknownState`] when no state is called
    /// `target`.
    pub fn transition_to_named(
        &mut self,
        from: StateId,
        target: &str,
    ) -> Result<&mut FsmTransition, HumanoidError> {
        let Some(to) = self.state_id(target) else {
            error!(fsm = %self.id, state = %target, "transition to unknown state");
            return Err(HumanoidError::UnknownState {
                fsm: self.id.clone(),
                state: target.to_string(),
            });
        };
        Ok(self.transition(from, to))
    }

    /// Add a transition to `to` that is checked in every state, before the
    /// state's own transitions.
    pub fn wildcard_transition(&mut self, to: StateId) -> &mut FsmTransition {
        self.slot(to);
        self.wildcard_transitions
            .push(FsmTransition::new(None, to, Vec::new()));
        let last = self.wildcard_transitions.len() - 1;
        &mut self.wildcard_transitions[last]
    }

    fn slot(&self, id: StateId) -> usize {
        debug_assert_eq!(id.fsm, self.tag, "state id used with an FSM that did not create it");
        id.index
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name == name)
            .map(|index| StateId {
                fsm: self.tag,
                index,
            })
    }

    pub fn state(&self, id: StateId) -> &FsmState {
        &self.states[self.slot(id)]
    }

    pub fn states(&self) -> &[FsmState] {
        &self.states
    }

    pub fn wildcard_transitions(&self) -> &[FsmTransition] {
        &self.wildcard_transitions
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start
    }

    pub fn current_state(&self) -> Option<StateId> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_state_name(&self) -> Option<String> {
        self.current_state().map(|id| self.states[self.slot(id)].name.clone())
    }

    /// Timer on `state`'s most recent entry, usable inside conditions built
    /// before the FSM is shared.
    pub fn state_timer(&self, state: StateId) -> StateTimer {
        StateTimer {
            entered_at: Arc::clone(&self.states[self.slot(state)].entered_at),
            clock: Arc::clone(&self.clock),
        }
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Make `state` current: record its entry time, run its enter hooks and
    /// announce it.
    pub fn set_current_state(&self, state: StateId) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);

        let entered = &self.states[self.slot(state)];
        *entered
            .entered_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.clock.now());

        for hook in &entered.on_enter {
            hook();
        }

        if let Some(announcer) = &self.announcer {
            announcer.announce(&entered.name);
        }
    }

    fn first_satisfied(&self, current: StateId) -> Option<&FsmTransition> {
        self.wildcard_transitions
            .iter()
            .find(|t| t.is_satisfied())
            .or_else(|| {
                self.states[self.slot(current)]
                    .transitions
                    .iter()
                    .find(|t| t.is_satisfied())
            })
    }

    /// Graphviz rendering: states as nodes (start bold, final double
    /// circled), transitions as labelled edges, wildcard transitions from a
    /// point node `*`.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape(&self.id));
        let _ = writeln!(dot, "  node [shape=circle];");
        for state in &self.states {
            let mut attrs = Vec::new();
            if state.is_final {
                attrs.push("shape=doublecircle");
            }
            if state.is_start {
                attrs.push("style=bold");
            }
            if attrs.is_empty() {
                let _ = writeln!(dot, "  \"{}\";", escape(&state.name));
            } else {
                let _ = writeln!(dot, "  \"{}\" [{}];", escape(&state.name), attrs.join(", "));
            }
        }
        if !self.wildcard_transitions.is_empty() {
            let _ = writeln!(dot, "  \"*\" [shape=point];");
        }

        let edges = self
            .wildcard_transitions
            .iter()
            .chain(self.states.iter().flat_map(|s| s.transitions.iter()));
        for transition in edges {
            let from = match transition.from {
                Some(id) => escape(&self.states[self.slot(id)].name),
                None => "*".to_string(),
            };
            let to = escape(&self.states[self.slot(transition.to)].name);
            match &transition.name {
                Some(label) => {
                    let _ = writeln!(dot, "  \"{from}\" -> \"{to}\" [label=\"{}\"];", escape(label));
                }
                None => {
                    let _ = writeln!(dot, "  \"{from}\" -> \"{to}\";");
                }
            }
        }
        dot.push_str("}\n");
        dot
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl BehaviorOption for FsmOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "FSM"
    }

    fn has_terminated(&self) -> f64 {
        match self.current_state() {
            Some(id) if self.states[self.slot(id)].is_final => 1.0,
            _ => 0.0,
        }
    }

    fn reset(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn run_policy(&self) -> OptionList {
        let mut current = match self.current_state() {
            Some(id) => id,
            None => {
                let Some(start) = self.start else {
                    error!(fsm = %self.id, "FSM has no start state; nothing to run");
                    return Vec::new();
                };
                self.set_current_state(start);
                start
            }
        };
        trace!(fsm = %self.id, state = %self.states[self.slot(current)].name, "current state");

        let mut walk =
            TransitionWalk::new(self.max_transition_walk, &self.states[self.slot(current)].name);
        while let Some(transition) = self.first_satisfied(current) {
            let from = &self.states[self.slot(current)];
            let to = &self.states[self.slot(transition.to)];
            let elapsed_ms = from
                .entered_at()
                .map(|at| u64::try_from(self.clock.since(at).as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default();
            info!(
                fsm = %self.id,
                from = %from.name,
                to = %to.name,
                via = transition.name.as_deref().unwrap_or(""),
                wildcard = transition.is_wildcard(),
                elapsed_ms,
                "transitioning"
            );

            self.set_current_state(transition.to);
            if let Some(on_fire) = &transition.on_fire {
                on_fire();
            }
            current = self.current_state().unwrap_or(transition.to);

            if walk.record(&self.states[self.slot(current)].name) {
                error!(
                    fsm = %self.id,
                    hops = walk.hops(),
                    trail = %walk.trail(),
                    "transition walk exceeded maximum number of iterations; stopping for this cycle"
                );
                break;
            }
        }

        debug!(fsm = %self.id, state = %self.states[self.slot(current)].name, "final state");
        self.states[self.slot(current)].options.clone()
    }

    fn validate(&self) -> Result<(), HumanoidError> {
        if self.start.is_none() {
            error!(fsm = %self.id, "FSM has no start state");
            return Err(HumanoidError::MissingStartState(self.id.clone()));
        }
        Ok(())
    }

    fn as_fsm(&self) -> Option<&FsmOption> {
        Some(self)
    }
}
