use std::sync::Arc;

use humanoid_hal::MotionControl;
use humanoid_types::MotionCommand;
use tracing::trace;

use crate::option::{BehaviorOption, OptionList};

/// Asks the walk engine to stop; terminated once it no longer walks.
pub struct StopWalking {
    id: String,
    motion: Arc<dyn MotionControl>,
}

impl StopWalking {
    pub fn new(id: impl Into<String>, motion: Arc<dyn MotionControl>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            motion,
        })
    }
}

impl BehaviorOption for StopWalking {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "StopWalking"
    }

    fn has_terminated(&self) -> f64 {
        if self.motion.is_walking() { 0.0 } else { 1.0 }
    }

    fn run_policy(&self) -> OptionList {
        trace!(option = %self.id, "requesting walk stop");
        self.motion.submit(MotionCommand::StopWalking);
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_hal::SimMotion;

    #[test]
    fn terminates_once_walk_has_settled() {
        let motion = Arc::new(SimMotion::new());
        motion.submit(MotionCommand::SetDirection { x: 0.3, y: 0.0 });
        let option = StopWalking::new("stop-walking", motion.clone());

        assert_eq!(option.has_terminated(), 0.0);
        option.run_policy();
        assert_eq!(motion.last_command(), Some(MotionCommand::StopWalking));
        assert_eq!(option.has_terminated(), 0.0, "walk engine winds down on its own thread");

        motion.step();
        assert_eq!(option.has_terminated(), 1.0);
    }

    #[test]
    fn already_standing_is_done_immediately() {
        let motion = Arc::new(SimMotion::new());
        let option = StopWalking::new("stop-walking", motion);
        assert_eq!(option.has_terminated(), 1.0);
    }
}
