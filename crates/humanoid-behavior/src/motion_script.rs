//! [`MotionScriptOption`] – plays a named motion script to completion.
//!
//! The script is started on the first cycle the option runs and the option
//! reports termination once the player is idle again.  Running the option
//! again after the script finished replays it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use humanoid_hal::MotionControl;
use humanoid_types::MotionCommand;
use tracing::{debug, warn};

use crate::option::{BehaviorOption, OptionList};

pub struct MotionScriptOption {
    id: String,
    script: String,
    motion: Arc<dyn MotionControl>,
    playing: AtomicBool,
}

impl MotionScriptOption {
    pub fn new(
        id: impl Into<String>,
        script: impl Into<String>,
        motion: Arc<dyn MotionControl>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            script: script.into(),
            motion,
            playing: AtomicBool::new(false),
        })
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

impl BehaviorOption for MotionScriptOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "MotionScript"
    }

    fn has_terminated(&self) -> f64 {
        if self.playing.load(Ordering::Acquire) && !self.motion.is_script_running() {
            1.0
        } else {
            0.0
        }
    }

    fn reset(&self) {
        self.playing.store(false, Ordering::Release);
    }

    fn run_policy(&self) -> OptionList {
        if self.playing.load(Ordering::Acquire) && self.motion.is_script_running() {
            return Vec::new();
        }

        let command = MotionCommand::StartScript {
            script: self.script.clone(),
        };
        if self.motion.submit(command) {
            debug!(option = %self.id, script = %self.script, "motion script started");
            self.playing.store(true, Ordering::Release);
        } else {
            warn!(option = %self.id, script = %self.script, "motion script refused; retrying next cycle");
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_hal::SimMotion;

    #[test]
    fn plays_script_once_until_finished() {
        let motion = Arc::new(SimMotion::new().with_script_steps(2));
        let sit = MotionScriptOption::new("sit-down", "sit-down", motion.clone());

        assert_eq!(sit.has_terminated(), 0.0, "never started");
        sit.run_policy();
        assert_eq!(motion.active_script().as_deref(), Some("sit-down"));

        sit.run_policy();
        assert_eq!(motion.commands().len(), 1, "no restart while playing");

        motion.step();
        assert_eq!(sit.has_terminated(), 0.0);
        motion.step();
        assert_eq!(sit.has_terminated(), 1.0);
    }

    #[test]
    fn refused_start_is_retried() {
        let motion = Arc::new(SimMotion::new().with_script_steps(1));
        let first = MotionScriptOption::new("kick", "kick-left", motion.clone());
        let second = MotionScriptOption::new("wave", "wave", motion.clone());

        first.run_policy();
        second.run_policy();
        assert_eq!(second.has_terminated(), 0.0);

        motion.step();
        second.run_policy();
        assert_eq!(motion.active_script().as_deref(), Some("wave"));
    }

    #[test]
    fn reset_allows_replay() {
        let motion = Arc::new(SimMotion::new().with_script_steps(1));
        let kick = MotionScriptOption::new("kick", "kick-left", motion.clone());
        kick.run_policy();
        motion.step();
        assert_eq!(kick.has_terminated(), 1.0);

        kick.reset();
        assert_eq!(kick.has_terminated(), 0.0);
        kick.run_policy();
        assert_eq!(motion.commands().len(), 2);
    }
}
