//! The [`BehaviorOption`] contract.
//!
//! An option is a temporally extended, possibly semi-Markov unit of
//! behaviour.  Each think cycle the scheduler calls
//! [`run_policy`][BehaviorOption::run_policy], which performs the option's
//! effect for this cycle and returns the sub-options to run next.  An empty
//! list marks the option as a leaf for this cycle.
//!
//! Options are shared: an FSM state, a sequence and the tree registry may all
//! hold the same [`OptionRef`].  Methods therefore take `&self`; an option
//! that keeps progress between cycles stores it behind interior mutability.

use std::sync::Arc;

use humanoid_types::HumanoidError;

use crate::fsm::FsmOption;

/// Shared handle to an option.
pub type OptionRef = Arc<dyn BehaviorOption>;

/// Ordered selection returned by a policy.
pub type OptionList = Vec<OptionRef>;

/// Termination value at or above which an option counts as done.
pub const TERMINATED: f64 = 1.0;

pub trait BehaviorOption: Send + Sync {
    /// Identifier, unique within an [`OptionTree`][crate::OptionTree].
    fn id(&self) -> &str;

    /// Kind of option, for diagnostics (e.g. `"FSM"`, `"Sequence"`).
    fn type_name(&self) -> &str;

    /// Whether a parent should consider selecting this option.  The scheduler
    /// itself never checks this.
    fn is_available(&self) -> bool {
        true
    }

    /// Probability in `[0, 1]` that the option has reached its goal.
    ///
    /// Defaults to `1.0`: a single-step action.
    fn has_terminated(&self) -> f64 {
        TERMINATED
    }

    /// Clear internal progress so the option starts fresh next time.
    fn reset(&self) {}

    /// Perform this cycle's effect and select the sub-options to run next.
    ///
    /// Must not block.
    fn run_policy(&self) -> OptionList {
        Vec::new()
    }

    /// Check wiring at registration time.
    fn validate(&self) -> Result<(), HumanoidError> {
        Ok(())
    }

    /// Downcast hook used by the tree to report FSM states.
    fn as_fsm(&self) -> Option<&FsmOption> {
        None
    }
}

/// `true` once `option` reports termination.
pub fn is_terminated(option: &dyn BehaviorOption) -> bool {
    option.has_terminated() >= TERMINATED
}

/// Identity of an option instance, independent of its id string.
pub(crate) fn instance_key(option: &OptionRef) -> usize {
    Arc::as_ptr(option).cast::<()>() as usize
}
