//! [`ApproachBall`] – walks towards the most recent ball observation.
//!
//! Reads [`BallObservation`] from the [`StateStore`] every cycle.  While the
//! ball is further away than the stop distance the option steers towards it
//! at the configured speed; once within the stop distance it stops the walk
//! and reports termination.  Both values are live settings:
//!
//! | Setting | Default |
//! |---|---|
//! | `options.approach.speed` | `0.5` |
//! | `options.approach.stop-distance` | `0.2` |

use std::sync::Arc;

use humanoid_hal::MotionControl;
use humanoid_middleware::{Settings, StateStore};
use humanoid_types::{BallObservation, MotionCommand};
use tracing::trace;

use crate::option::{BehaviorOption, OptionList};

pub const SPEED_SETTING: &str = "options.approach.speed";
pub const STOP_DISTANCE_SETTING: &str = "options.approach.stop-distance";

const DEFAULT_SPEED: f64 = 0.5;
const DEFAULT_STOP_DISTANCE: f64 = 0.2;

pub struct ApproachBall {
    id: String,
    store: StateStore,
    motion: Arc<dyn MotionControl>,
    settings: Settings,
}

impl ApproachBall {
    pub fn new(
        id: impl Into<String>,
        store: StateStore,
        motion: Arc<dyn MotionControl>,
        settings: Settings,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            store,
            motion,
            settings,
        })
    }

    fn stop_distance(&self) -> f64 {
        self.settings
            .get_f64(STOP_DISTANCE_SETTING, DEFAULT_STOP_DISTANCE)
    }
}

impl BehaviorOption for ApproachBall {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "ApproachBall"
    }

    fn is_available(&self) -> bool {
        self.store.get::<BallObservation>().is_some()
    }

    fn has_terminated(&self) -> f64 {
        match self.store.get::<BallObservation>() {
            Some(ball) if ball.distance() <= self.stop_distance() => 1.0,
            _ => 0.0,
        }
    }

    fn run_policy(&self) -> OptionList {
        let Some(ball) = self.store.get::<BallObservation>() else {
            trace!(option = %self.id, "no ball observation");
            return Vec::new();
        };

        let distance = ball.distance();
        if distance <= self.stop_distance() {
            self.motion.submit(MotionCommand::StopWalking);
            return Vec::new();
        }

        let speed = self.settings.get_f64(SPEED_SETTING, DEFAULT_SPEED);
        let (x, y) = (ball.x / distance * speed, ball.y / distance * speed);
        trace!(option = %self.id, distance, x, y, "approaching ball");
        self.motion.submit(MotionCommand::SetDirection { x, y });
        self.motion.submit(MotionCommand::SetTurn {
            turn: ball.y.atan2(ball.x),
        });
        Vec::new()
    }
}
