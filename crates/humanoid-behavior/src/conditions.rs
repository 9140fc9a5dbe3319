//! Stateful condition combinators for FSM transitions.
//!
//! Each function wraps one or more conditions and returns a new closure that
//! can be passed to [`FsmTransition::when`][crate::FsmTransition::when].
//! Stateful combinators keep their counters inside the returned closure, so
//! every call site gets independent state.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use humanoid_types::Clock;

use crate::fsm::Condition;

/// Inverts `condition`.
pub fn negate<C>(condition: C) -> impl Fn() -> bool + Send + Sync + 'static
where
    C: Fn() -> bool + Send + Sync + 'static,
{
    move || !condition()
}

/// True when every condition is true.  Stops at the first false one.
pub fn all_of(conditions: Vec<Condition>) -> impl Fn() -> bool + Send + Sync + 'static {
    move || conditions.iter().all(|c| c())
}

/// True when any condition is true.  Stops at the first true one.
pub fn any_of(conditions: Vec<Condition>) -> impl Fn() -> bool + Send + Sync + 'static {
    move || conditions.iter().any(|c| c())
}

/// True once `condition` has held on `times` consecutive evaluations.
pub fn is_repeated<C>(times: u32, condition: C) -> impl Fn() -> bool + Send + Sync + 'static
where
    C: Fn() -> bool + Send + Sync + 'static,
{
    let count = AtomicU32::new(0);
    move || {
        if condition() {
            let n = count.fetch_add(1, Ordering::Relaxed).saturating_add(1);
            n >= times
        } else {
            count.store(0, Ordering::Relaxed);
            false
        }
    }
}

/// True for the first `times` evaluations, false afterwards.
pub fn true_n_times(times: u32) -> impl Fn() -> bool + Send + Sync + 'static {
    let count = AtomicU32::new(0);
    move || {
        let n = count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_add(1)))
            .unwrap_or(u32::MAX);
        n < times
    }
}

/// True once `condition` has been continuously true for longer than
/// `duration`, measured by `clock`.
pub fn true_for<C>(
    duration: Duration,
    clock: Arc<dyn Clock>,
    condition: C,
) -> impl Fn() -> bool + Send + Sync + 'static
where
    C: Fn() -> bool + Send + Sync + 'static,
{
    let turned_true_at: Mutex<Option<Instant>> = Mutex::new(None);
    move || {
        let mut since = turned_true_at.lock().unwrap_or_else(PoisonError::into_inner);
        if !condition() {
            *since = None;
            return false;
        }
        match *since {
            Some(at) => clock.since(at) > duration,
            None => {
                *since = Some(clock.now());
                false
            }
        }
    }
}

/// Debounce: each true evaluation steps a counter up towards `threshold`,
/// each false one steps it down towards zero.  True while the counter sits at
/// `threshold`.
pub fn step_up_down_threshold<C>(
    threshold: usize,
    condition: C,
) -> impl Fn() -> bool + Send + Sync + 'static
where
    C: Fn() -> bool + Send + Sync + 'static,
{
    let count = AtomicUsize::new(0);
    move || {
        let n = count.load(Ordering::Relaxed);
        if condition() {
            if n < threshold {
                count.store(n + 1, Ordering::Relaxed);
                return n + 1 == threshold;
            }
            true
        } else {
            if n > 0 {
                count.store(n - 1, Ordering::Relaxed);
            }
            false
        }
    }
}

/// Builds a condition with `factory` on first use and keeps it until it
/// returns true; the next evaluation then builds a fresh one.
///
/// Useful for stateful conditions that must start over each time they fire,
/// e.g. `one_shot(|| Box::new(is_repeated(3, ...)))`.
pub fn one_shot<F>(factory: F) -> impl Fn() -> bool + Send + Sync + 'static
where
    F: Fn() -> Condition + Send + Sync + 'static,
{
    let current: Mutex<Option<Condition>> = Mutex::new(None);
    move || {
        let mut slot = current.lock().unwrap_or_else(PoisonError::into_inner);
        let fired = {
            let condition = slot.get_or_insert_with(&factory);
            (**condition)()
        };
        if fired {
            *slot = None;
            true
        } else {
            false
        }
    }
}
