//! [`OptionTree`] – registry and breadth-first scheduler of options.
//!
//! Each think cycle [`run`][OptionTree::run] starts at the root option,
//! calls its policy, and queues every option the policy returns.  Queued
//! options run in first-in first-out order, so all options selected at one
//! depth run before any option they select in turn.  An option instance
//! discovered more than once in the same cycle runs once.
//!
//! After the walk the tree records what ran, and the state each FSM was left
//! in, as an [`OptionTreeSnapshot`].  The snapshot is stored in the
//! [`StateStore`] (when attached) and broadcast on [`Topic::Telemetry`]
//! (when a bus is attached).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use humanoid_middleware::{EventBus, StateStore, Topic};
use humanoid_types::{
    Event, EventPayload, FsmStateSnapshot, HumanoidError, OptionTreeSnapshot, RanOption,
};
use tracing::{debug, error, info, info_span, trace};

use crate::fsm::FsmOption;
use crate::option::{BehaviorOption, OptionRef, instance_key};

#[derive(Default)]
pub struct OptionTree {
    options: HashMap<String, OptionRef>,
    root: Option<OptionRef>,
    fsms: Vec<OptionRef>,
    store: Option<StateStore>,
    bus: Option<EventBus>,
    cycle: u64,
    last_snapshot: Option<OptionTreeSnapshot>,
}

impl OptionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish each cycle's snapshot into `store`.
    pub fn with_state_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Broadcast each cycle's snapshot on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Register `option`; `is_top` makes it the root that every cycle starts
    /// from.
    ///
    /// # Errors
    ///
    /// * [`HumanoidError::DuplicateRoot`] – a root is already registered.
    /// * [`HumanoidError::DuplicateOption`] – the id is taken.
    /// * Whatever [`validate`][crate::BehaviorOption::validate] reports.
    ///
    /// A failed registration leaves the tree unchanged.
    pub fn add_option(&mut self, option: OptionRef, is_top: bool) -> Result<(), HumanoidError> {
        let id = option.id().to_string();

        if is_top && let Some(existing) = &self.root {
            error!(existing = %existing.id(), attempted = %id, "option tree already has a root");
            return Err(HumanoidError::DuplicateRoot {
                existing: existing.id().to_string(),
                attempted: id,
            });
        }
        if self.options.contains_key(&id) {
            error!(option = %id, "option id already registered");
            return Err(HumanoidError::DuplicateOption(id));
        }
        option.validate()?;

        if option.as_fsm().is_some() {
            self.fsms.push(Arc::clone(&option));
        }
        if is_top {
            self.root = Some(Arc::clone(&option));
        }
        debug!(option = %id, type_name = %option.type_name(), is_top, "option registered");
        self.options.insert(id, option);
        Ok(())
    }

    /// Look up a registered option by id.  Logs an error when absent.
    pub fn get_option(&self, id: &str) -> Option<OptionRef> {
        let found = self.options.get(id).cloned();
        if found.is_none() {
            error!(option = %id, "no option registered with this id");
        }
        found
    }

    /// Like [`get_option`][Self::get_option], for wiring code that cannot
    /// continue without the option.
    ///
    /// # Errors
    ///
    /// [`HumanoidError::UnknownOption`] when no option has this id.
    pub fn require_option(&self, id: &str) -> Result<OptionRef, HumanoidError> {
        self.get_option(id)
            .ok_or_else(|| HumanoidError::UnknownOption(id.to_string()))
    }

    pub fn root(&self) -> Option<&OptionRef> {
        self.root.as_ref()
    }

    /// Every registered FSM option, in registration order.
    pub fn fsms(&self) -> impl Iterator<Item = &FsmOption> {
        self.fsms.iter().filter_map(|o| o.as_fsm())
    }

    /// Number of completed think cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Snapshot of the most recent cycle.
    pub fn last_snapshot(&self) -> Option<&OptionTreeSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Run one think cycle.
    ///
    /// Returns `None` without doing anything when no root is registered.
    pub fn run(&mut self) -> Option<OptionTreeSnapshot> {
        let Some(root) = self.root.clone() else {
            error!("option tree has no root; skipping think cycle");
            return None;
        };

        let cycle = self.cycle + 1;
        let span = info_span!("think_cycle", cycle);
        let _enter = span.enter();

        let mut seen: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<OptionRef> = VecDeque::new();
        let mut ran: Vec<RanOption> = Vec::new();
        let mut fsm_states: Vec<FsmStateSnapshot> = Vec::new();

        seen.insert(instance_key(&root));
        queue.push_back(root);

        while let Some(option) = queue.pop_front() {
            trace!(option = %option.id(), "running policy");
            let selected = option.run_policy();

            ran.push(RanOption {
                id: option.id().to_string(),
                type_name: option.type_name().to_string(),
            });
            if let Some(fsm) = option.as_fsm()
                && let Some(state) = fsm.current_state_name()
            {
                fsm_states.push(FsmStateSnapshot {
                    fsm: fsm.id().to_string(),
                    state,
                });
            }

            for child in selected {
                if seen.insert(instance_key(&child)) {
                    queue.push_back(child);
                } else {
                    debug!(
                        parent = %option.id(),
                        option = %child.id(),
                        "option already ran this cycle; skipping"
                    );
                }
            }
        }

        let snapshot = OptionTreeSnapshot {
            cycle,
            timestamp: Utc::now(),
            ran,
            fsm_states,
        };
        debug!(ran = ?snapshot.ran_ids(), "think cycle complete");

        if let Some(store) = &self.store {
            store.set(snapshot.clone());
        }
        if let Some(bus) = &self.bus {
            let event = Event::new(
                "humanoid-behavior::option_tree",
                EventPayload::OptionTree(snapshot.clone()),
            );
            if let Err(e) = bus.publish_to(Topic::Telemetry, event) {
                trace!(error = %e, "telemetry snapshot not delivered");
            }
        }

        self.cycle = cycle;
        self.last_snapshot = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Render every registered FSM as Graphviz, one digraph per FSM.
    pub fn fsms_to_dot(&self) -> String {
        let dot: String = self.fsms().map(|fsm| fsm.to_dot()).collect();
        info!(fsms = self.fsms.len(), "rendered FSM graphs");
        dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::testing::Stub;
    use crate::{ApproachBall, SequenceOption, StopWalking};
    use humanoid_hal::{MotionControl, SimMotion};
    use humanoid_middleware::Settings;
    use humanoid_types::{BallObservation, ManualClock, MotionCommand};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn as_ref(stub: &Arc<Stub>) -> OptionRef {
        Arc::clone(stub) as OptionRef
    }

    #[test]
    fn no_root_runs_nothing() {
        let mut tree = OptionTree::new();
        tree.add_option(Stub::new("floating"), false).unwrap();
        assert!(tree.run().is_none());
        assert_eq!(tree.cycle(), 0);
    }

    #[test]
    fn second_root_is_rejected() {
        let mut tree = OptionTree::new();
        tree.add_option(Stub::new("win"), true).unwrap();
        let err = tree.add_option(Stub::new("other"), true).unwrap_err();
        assert_eq!(
            err,
            HumanoidError::DuplicateRoot {
                existing: "win".to_string(),
                attempted: "other".to_string(),
            }
        );
        assert_eq!(tree.root().map(|r| r.id().to_string()).as_deref(), Some("win"));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut tree = OptionTree::new();
        tree.add_option(Stub::new("kick"), false).unwrap();
        assert_eq!(
            tree.add_option(Stub::new("kick"), false),
            Err(HumanoidError::DuplicateOption("kick".to_string()))
        );
    }

    #[test]
    fn invalid_option_is_not_registered() {
        let mut tree = OptionTree::new();
        let fsm = FsmOption::new("no-start", Arc::new(ManualClock::new()));
        assert_eq!(
            tree.add_option(Arc::new(fsm), true),
            Err(HumanoidError::MissingStartState("no-start".to_string()))
        );
        assert!(tree.root().is_none());
        assert_eq!(tree.fsms().count(), 0);
    }

    #[test]
    fn get_option_finds_registered() {
        let mut tree = OptionTree::new();
        tree.add_option(Stub::new("look-around"), false).unwrap();
        assert!(tree.get_option("look-around").is_some());
        assert!(tree.get_option("missing").is_none());
        assert_eq!(
            tree.require_option("missing").err(),
            Some(HumanoidError::UnknownOption("missing".to_string()))
        );
    }

    #[test]
    fn runs_breadth_first() {
        // root -> [a, b]; a -> [a1]; b -> [b1]
        let a1 = Stub::new("a1");
        let b1 = Stub::new("b1");
        let a = Stub::with_children("a", vec![as_ref(&a1)]);
        let b = Stub::with_children("b", vec![as_ref(&b1)]);
        let root = Stub::with_children("root", vec![as_ref(&a), as_ref(&b)]);

        let mut tree = OptionTree::new();
        tree.add_option(as_ref(&root), true).unwrap();

        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["root", "a", "b", "a1", "b1"]);
        assert_eq!(snapshot.cycle, 1);
    }

    #[test]
    fn shared_child_runs_once_per_cycle() {
        let shared = Stub::new("shared");
        let a = Stub::with_children("a", vec![as_ref(&shared)]);
        let b = Stub::with_children("b", vec![as_ref(&shared)]);
        let root = Stub::with_children("root", vec![as_ref(&a), as_ref(&b)]);

        let mut tree = OptionTree::new();
        tree.add_option(as_ref(&root), true).unwrap();

        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["root", "a", "b", "shared"]);
        assert_eq!(shared.runs(), 1);

        tree.run();
        assert_eq!(shared.runs(), 2);
    }

    #[test]
    fn repeated_cycles_are_deterministic() {
        let leaf = Stub::new("leaf");
        let mid = Stub::with_children("mid", vec![as_ref(&leaf)]);
        let root = Stub::with_children("root", vec![as_ref(&mid), as_ref(&leaf)]);
        let mut tree = OptionTree::new();
        tree.add_option(as_ref(&root), true).unwrap();

        let first = tree.run().unwrap();
        let second = tree.run().unwrap();
        assert_eq!(first.ran, second.ran);
        assert_eq!(second.cycle, 2);
    }

    #[test]
    fn snapshot_is_stored_and_broadcast() {
        let store = StateStore::new();
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Telemetry);

        let mut tree = OptionTree::new()
            .with_state_store(store.clone())
            .with_event_bus(bus.clone());
        tree.add_option(Stub::new("root"), true).unwrap();
        tree.run();

        let stored = store.get::<OptionTreeSnapshot>().unwrap();
        assert_eq!(stored.ran_ids(), vec!["root"]);

        let event = rx.try_recv().unwrap();
        assert!(matches!(event.payload, EventPayload::OptionTree(ref s) if s.cycle == 1));
        assert_eq!(tree.last_snapshot().map(|s| s.cycle), Some(1));
    }

    #[test]
    fn play_scenario_stops_then_approaches_ball() {
        let clock = Arc::new(ManualClock::new());
        let store = StateStore::new();
        let settings = Settings::new();
        let motion = Arc::new(SimMotion::new());
        let ball_visible = Arc::new(AtomicBool::new(false));

        let stop = StopWalking::new("stop-walking", motion.clone());
        let approach = ApproachBall::new("approach-ball", store.clone(), motion.clone(), settings);
        let chase = SequenceOption::new(
            "chase",
            vec![stop.clone() as OptionRef, approach.clone() as OptionRef],
        )
        .unwrap();

        let mut fsm = FsmOption::new("play", clock);
        let idle = fsm.new_start_state("idle", vec![]);
        let active = fsm.new_state("active", vec![chase.clone() as OptionRef]);
        let visible = Arc::clone(&ball_visible);
        fsm.transition(idle, active)
            .named("ball-seen")
            .when(move || visible.load(Ordering::SeqCst));
        let fsm = Arc::new(fsm);

        let mut tree = OptionTree::new().with_state_store(store.clone());
        tree.add_option(fsm.clone(), true).unwrap();
        tree.add_option(chase.clone(), false).unwrap();
        tree.add_option(stop.clone(), false).unwrap();
        tree.add_option(approach.clone(), false).unwrap();

        // Idle: nothing below the FSM runs.
        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["play"]);
        assert_eq!(snapshot.state_of("play"), Some("idle"));

        // Robot is walking when the ball shows up: stop first.
        motion.submit(MotionCommand::SetDirection { x: 0.2, y: 0.0 });
        store.set(BallObservation { x: 2.0, y: 0.0 });
        ball_visible.store(true, Ordering::SeqCst);
        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["play", "chase", "stop-walking"]);
        assert_eq!(snapshot.state_of("play"), Some("active"));
        assert_eq!(motion.last_command(), Some(MotionCommand::StopWalking));

        // Once the walk has settled the sequence moves on to the approach.
        motion.step();
        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["play", "chase", "approach-ball"]);
        assert!(matches!(motion.last_command(), Some(MotionCommand::SetTurn { .. })));
        assert!(motion.is_walking());
        assert_eq!(tree.fsms().count(), 1);
    }

    #[test]
    fn standing_robot_still_runs_stop_before_approach() {
        let store = StateStore::new();
        let motion = Arc::new(SimMotion::new());
        let stop = StopWalking::new("stop-walking", motion.clone());
        let approach = ApproachBall::new(
            "approach-ball",
            store.clone(),
            motion.clone(),
            Settings::new(),
        );
        let chase = SequenceOption::new(
            "chase",
            vec![stop.clone() as OptionRef, approach.clone() as OptionRef],
        )
        .unwrap();
        assert_eq!(stop.has_terminated(), 1.0);

        let mut tree = OptionTree::new();
        tree.add_option(chase.clone(), true).unwrap();
        store.set(BallObservation { x: 2.0, y: 0.0 });

        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["chase", "stop-walking"]);
        assert_eq!(motion.last_command(), Some(MotionCommand::StopWalking));

        let snapshot = tree.run().unwrap();
        assert_eq!(snapshot.ran_ids(), vec!["chase", "approach-ball"]);
    }

    #[test]
    fn looping_fsm_is_cut_off_and_tree_keeps_running() {
        let mut fsm = FsmOption::new("ping-pong", Arc::new(ManualClock::new()));
        let ping = fsm.new_start_state("ping", vec![]);
        let pong = fsm.new_state("pong", vec![]);
        fsm.transition(ping, pong);
        fsm.transition(pong, ping);

        let mut tree = OptionTree::new();
        tree.add_option(Arc::new(fsm), true).unwrap();

        let first = tree.run().unwrap();
        assert_eq!(first.state_of("ping-pong"), Some("ping"));
        let second = tree.run().unwrap();
        assert_eq!(second.cycle, 2);
    }

    #[test]
    fn dot_export_covers_all_fsms() {
        let mut a = FsmOption::new("a", Arc::new(ManualClock::new()));
        a.new_start_state("one", vec![]);
        let mut b = FsmOption::new("b", Arc::new(ManualClock::new()));
        b.new_start_state("two", vec![]);

        let mut tree = OptionTree::new();
        tree.add_option(Arc::new(a), true).unwrap();
        tree.add_option(Arc::new(b), false).unwrap();

        let dot = tree.fsms_to_dot();
        assert!(dot.contains("digraph \"a\""));
        assert!(dot.contains("digraph \"b\""));
        assert_eq!(tree.root().map(|r| r.id()), Some("a"));
    }
}
