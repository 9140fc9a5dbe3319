//! [`StateStore`] – the most recent value of every state object, by type.
//!
//! Perception, localisation and the behaviour engine each publish their
//! outputs here; any behaviour can then read the latest value with
//! [`StateStore::get`].  Values are stored behind [`Arc`] so a reader holds
//! on to a consistent snapshot even while a writer replaces it.
//!
//! # Example
//!
//! ```
//! use humanoid_middleware::StateStore;
//! use humanoid_types::BallObservation;
//!
//! let store = StateStore::new();
//! assert!(store.get::<BallObservation>().is_none());
//!
//! store.set(BallObservation { x: 1.0, y: 0.5 });
//! let ball = store.get::<BallObservation>().unwrap();
//! assert_eq!(ball.x, 1.0);
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

type Slot = Arc<dyn Any + Send + Sync>;

/// Type-indexed store of the latest published state objects.
///
/// Clone it cheaply – all clones share the same storage.
#[derive(Clone, Default)]
pub struct StateStore {
    slots: Arc<RwLock<HashMap<TypeId, Slot>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored value of type `T`.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        trace!(state = type_name::<T>(), "state updated");
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// The most recent value of type `T`, if one has been published.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Remove the value of type `T`, e.g. when an observation goes stale.
    pub fn clear<T: Any + Send + Sync>(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>());
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("StateStore").field("objects", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_types::{BallObservation, OptionTreeSnapshot};

    #[test]
    fn missing_type_returns_none() {
        let store = StateStore::new();
        assert!(store.get::<BallObservation>().is_none());
    }

    #[test]
    fn set_replaces_previous_value() {
        let store = StateStore::new();
        store.set(BallObservation { x: 1.0, y: 0.0 });
        store.set(BallObservation { x: 2.0, y: 0.0 });
        let ball = store.get::<BallObservation>().expect("ball must be present");
        assert!((ball.x - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn types_are_stored_independently() {
        let store = StateStore::new();
        store.set(BallObservation { x: 1.0, y: 1.0 });
        store.set(OptionTreeSnapshot {
            cycle: 7,
            timestamp: chrono::Utc::now(),
            ran: vec![],
            fsm_states: vec![],
        });
        assert_eq!(store.get::<OptionTreeSnapshot>().map(|s| s.cycle), Some(7));
        assert!(store.get::<BallObservation>().is_some());

        store.clear::<BallObservation>();
        assert!(store.get::<BallObservation>().is_none());
        assert!(store.get::<OptionTreeSnapshot>().is_some());
    }

    #[test]
    fn clones_share_storage_across_threads() {
        let store = StateStore::new();
        let writer = store.clone();
        std::thread::spawn(move || writer.set(BallObservation { x: 0.3, y: 0.0 }))
            .join()
            .expect("writer thread panicked");
        assert!(store.get::<BallObservation>().is_some());
    }

    #[test]
    fn reader_keeps_snapshot_after_overwrite() {
        let store = StateStore::new();
        store.set(BallObservation { x: 1.0, y: 0.0 });
        let held = store.get::<BallObservation>().unwrap();
        store.set(BallObservation { x: 9.0, y: 0.0 });
        assert!((held.x - 1.0).abs() < f64::EPSILON);
    }
}
