//! Demo behaviour graph and the toy world that drives it.
//!
//! The root dispatches on the current [`PlayMode`]: while `Ready` the robot
//! stops and sits, while `Playing` the `striker` FSM looks for the ball,
//! walks up to it and kicks.  [`SimWorld`] moves a simulated ball relative to
//! the robot so the graph has something to react to.

use std::sync::Arc;
use std::time::Duration;

use humanoid_behavior::conditions::{is_repeated, negate, true_for};
use humanoid_behavior::{
    Announcer, ApproachBall, BehaviorConfig, BehaviorOption, DispatchOption, FsmOption,
    MotionScriptOption, OptionRef, OptionTree, SequenceOption, StopWalking,
};
use humanoid_hal::{MotionControl, SimMotion};
use humanoid_middleware::{EventBus, Settings, StateStore};
use humanoid_types::{BallObservation, Clock, HumanoidError};
use tracing::debug;

/// Game phase as announced by the referee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayMode {
    Initial,
    Ready,
    Playing,
    Finished,
}

/// Collaborators the behaviour graph reads from and commands.
#[derive(Clone)]
pub struct Robot {
    pub store: StateStore,
    pub motion: Arc<SimMotion>,
    pub settings: Settings,
    pub bus: EventBus,
    pub clock: Arc<dyn Clock>,
}

/// Build the demo option tree.  The returned tree publishes its snapshots to
/// the robot's store and bus.
pub fn build_tree(robot: &Robot, behavior: &BehaviorConfig) -> Result<OptionTree, HumanoidError> {
    let motion = Arc::clone(&robot.motion);

    let stop_walking = StopWalking::new("stop-walking", motion.clone());
    let sit = MotionScriptOption::new("sit-down-script", "sit-down", motion.clone());
    let stand_up = MotionScriptOption::new("stand-up-script", "stand-ready-upright", motion.clone());
    let kick = MotionScriptOption::new("kick-script", "kick-right", motion.clone());
    let approach = ApproachBall::new(
        "approach-ball",
        robot.store.clone(),
        motion.clone(),
        robot.settings.clone(),
    );
    let stop_then_sit = SequenceOption::new(
        "stop-then-sit-sequence",
        vec![stop_walking.clone() as OptionRef, sit.clone() as OptionRef],
    )?;

    let striker = Arc::new(build_striker(
        robot,
        behavior,
        &stand_up,
        &stop_walking,
        &approach,
        &kick,
    )?);

    let mode_store = robot.store.clone();
    let play_mode = DispatchOption::new("play-mode", move || {
        mode_store
            .get::<PlayMode>()
            .map(|mode| *mode)
            .unwrap_or(PlayMode::Initial)
    })
    .with_option(PlayMode::Ready, stop_then_sit.clone())
    .with_option(PlayMode::Playing, striker.clone())
    .with_option(PlayMode::Finished, stop_walking.clone());

    let mut tree = OptionTree::new()
        .with_state_store(robot.store.clone())
        .with_event_bus(robot.bus.clone());
    tree.add_option(Arc::new(play_mode), true)?;
    tree.add_option(striker, false)?;
    tree.add_option(stop_then_sit, false)?;
    tree.add_option(stop_walking, false)?;
    tree.add_option(sit, false)?;
    tree.add_option(stand_up, false)?;
    tree.add_option(kick, false)?;
    tree.add_option(approach, false)?;
    Ok(tree)
}

fn build_striker(
    robot: &Robot,
    behavior: &BehaviorConfig,
    stand_up: &Arc<MotionScriptOption>,
    stop_walking: &Arc<StopWalking>,
    approach: &Arc<ApproachBall>,
    kick: &Arc<MotionScriptOption>,
) -> Result<FsmOption, HumanoidError> {
    let announcer = Announcer::new(robot.bus.clone(), robot.settings.clone(), behavior);
    let mut fsm = FsmOption::new("striker", Arc::clone(&robot.clock))
        .with_config(behavior)
        .with_announcer(announcer);

    let standing = fsm.new_start_state("stand-up", vec![stand_up.clone() as OptionRef]);
    let looking = fsm.new_state("look-for-ball", vec![stop_walking.clone() as OptionRef]);
    let approaching = fsm.new_state("approach-ball", vec![approach.clone() as OptionRef]);
    let kicking = fsm.new_state("kick", vec![kick.clone() as OptionRef]);

    let kick_script = Arc::clone(kick);
    fsm.on_enter(kicking, move || kick_script.reset());

    let ball_visible = {
        let store = robot.store.clone();
        move || store.get::<BallObservation>().is_some()
    };

    fsm.transition(standing, looking).named("standing").when_terminated();
    fsm.transition(looking, approaching)
        .named("ball-found")
        .when(is_repeated(3, ball_visible.clone()));
    fsm.transition(approaching, looking)
        .named("ball-lost")
        .when(true_for(
            Duration::from_secs(1),
            Arc::clone(&robot.clock),
            negate(ball_visible),
        ));
    fsm.transition(approaching, kicking)
        .named("at-ball")
        .when_terminated();
    fsm.transition_to_named(kicking, "look-for-ball")?
        .named("kicked")
        .when_terminated();

    Ok(fsm)
}

/// Ball positions the world cycles through after each kick, robot frame.
const BALL_SPOTS: [(f64, f64); 3] = [(2.0, 0.5), (1.5, -1.0), (3.0, 0.0)];

/// Metres moved per cycle per unit of walk speed.
const WALK_GAIN: f64 = 0.05;

const VISIBLE_RANGE: f64 = 4.0;

/// Toy world: referee phases by cycle count and a ball that gets closer as
/// the robot walks towards it.
pub struct SimWorld {
    store: StateStore,
    motion: Arc<SimMotion>,
    ball: (f64, f64),
    kicks: usize,
    cycle: u64,
    ready_until: u64,
    initial_until: u64,
}

impl SimWorld {
    pub fn new(store: StateStore, motion: Arc<SimMotion>) -> Self {
        Self {
            store,
            motion,
            ball: BALL_SPOTS[0],
            kicks: 0,
            cycle: 0,
            initial_until: 10,
            ready_until: 60,
        }
    }

    /// Switch referee phases after the given cycle counts.
    pub fn with_phases(mut self, initial_until: u64, ready_until: u64) -> Self {
        self.initial_until = initial_until;
        self.ready_until = ready_until.max(initial_until);
        self
    }

    pub fn kicks(&self) -> usize {
        self.kicks
    }

    /// Advance one think period and publish the resulting observations.
    pub fn step(&mut self) {
        self.cycle += 1;
        let mode = if self.cycle <= self.initial_until {
            PlayMode::Initial
        } else if self.cycle <= self.ready_until {
            PlayMode::Ready
        } else {
            PlayMode::Playing
        };
        self.store.set(mode);

        if self.motion.is_walking() {
            let (dx, dy) = self.motion.direction();
            self.ball.0 -= dx * WALK_GAIN;
            self.ball.1 -= dy * WALK_GAIN;
        }

        let kicking = self.motion.active_script().as_deref() == Some("kick-right");
        if kicking && self.ball.0.hypot(self.ball.1) < 0.5 {
            self.kicks += 1;
            self.ball = BALL_SPOTS[self.kicks % BALL_SPOTS.len()];
            debug!(kicks = self.kicks, ball = ?self.ball, "ball kicked");
        }

        let ball = BallObservation {
            x: self.ball.0,
            y: self.ball.1,
        };
        if ball.distance() < VISIBLE_RANGE {
            self.store.set(ball);
        } else {
            self.store.clear::<BallObservation>();
        }
    }
}
