//! [`TransitionWalk`] – bounds the transitions an FSM may take in one cycle.
//!
//! An FSM keeps evaluating transitions within a single think cycle until none
//! fires, so that it can pass through zero-duration states without waiting a
//! cycle per hop.  Two transitions whose conditions are both permanently true
//! would make that walk endless.  The walk records every state it enters and
//! reports once the hop limit is reached, keeping the trail so the log shows
//! which states were alternating.
//!
//! # Example
//!
//! ```rust
//! use humanoid_behavior::transition_walk::TransitionWalk;
//!
//! let mut walk = TransitionWalk::new(3, "idle");
//!
//! assert!(!walk.record("ready"));
//! assert!(!walk.record("set"));
//! assert!(walk.record("ready")); // third hop reaches the limit
//! assert_eq!(walk.trail(), "idle -> ready -> set -> ready");
//! ```

/// Hop counter and visited-state trail for one FSM transition walk.
pub struct TransitionWalk {
    /// Number of transitions after which the walk is cut off.
    limit: usize,
    /// Every state visited, starting with the state the walk began in.
    trail: Vec<String>,
}

impl TransitionWalk {
    /// Start a walk in state `from`.
    ///
    /// A `limit` of zero is treated as one: the first transition always fires.
    pub fn new(limit: usize, from: &str) -> Self {
        Self {
            limit: limit.max(1),
            trail: vec![from.to_string()],
        }
    }

    /// Record a transition into state `to`.
    ///
    /// Returns `true` once the walk has taken `limit` transitions, meaning the
    /// caller must stop evaluating transitions for this cycle.
    pub fn record(&mut self, to: &str) -> bool {
        self.trail.push(to.to_string());
        self.is_exhausted()
    }

    /// Number of transitions taken so far.
    pub fn hops(&self) -> usize {
        self.trail.len() - 1
    }

    pub fn is_exhausted(&self) -> bool {
        self.hops() >= self.limit
    }

    /// The visited states joined as `a -> b -> c`.
    pub fn trail(&self) -> String {
        self.trail.join(" -> ")
    }
}
