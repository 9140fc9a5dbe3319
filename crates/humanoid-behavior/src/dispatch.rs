//! [`DispatchOption`] – selects one child by a key computed each cycle.
//!
//! Typical use is switching on the game-controller play mode: a key function
//! reads the current mode and the dispatcher runs the option registered for
//! it.  When the selected option changes, the new one is reset first.  Keys
//! with no registered option select nothing; each such key is logged once.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use humanoid_types::HumanoidError;
use tracing::{debug, warn};

use crate::option::{BehaviorOption, OptionList, OptionRef, instance_key};

type KeyFn<K> = Box<dyn Fn() -> K + Send + Sync>;

pub struct DispatchOption<K>
where
    K: Eq + Hash + Debug + Clone + Send + Sync + 'static,
{
    id: String,
    key_fn: KeyFn<K>,
    options: HashMap<K, OptionRef>,
    selected: Mutex<Option<OptionRef>>,
    unknown_keys: Mutex<HashSet<K>>,
}

impl<K> DispatchOption<K>
where
    K: Eq + Hash + Debug + Clone + Send + Sync + 'static,
{
    pub fn new<F>(id: impl Into<String>, key_fn: F) -> Self
    where
        F: Fn() -> K + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            key_fn: Box::new(key_fn),
            options: HashMap::new(),
            selected: Mutex::new(None),
            unknown_keys: Mutex::new(HashSet::new()),
        }
    }

    /// Register `option` for `key`, replacing any previous entry.
    pub fn set_option(&mut self, key: K, option: OptionRef) {
        if let Some(previous) = self.options.insert(key.clone(), option) {
            debug!(dispatch = %self.id, ?key, replaced = %previous.id(), "dispatch entry replaced");
        }
    }

    pub fn with_option(mut self, key: K, option: OptionRef) -> Self {
        self.set_option(key, option);
        self
    }

    /// The option picked on the most recent cycle.
    pub fn selected(&self) -> Option<OptionRef> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<K> BehaviorOption for DispatchOption<K>
where
    K: Eq + Hash + Debug + Clone + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "Dispatch"
    }

    fn has_terminated(&self) -> f64 {
        match self.selected() {
            Some(option) => option.has_terminated(),
            None => 1.0,
        }
    }

    fn reset(&self) {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn run_policy(&self) -> OptionList {
        let key = (self.key_fn)();
        let Some(option) = self.options.get(&key) else {
            let first_miss = self
                .unknown_keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone());
            if first_miss {
                warn!(dispatch = %self.id, ?key, "no option registered for key");
            }
            *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = None;
            return Vec::new();
        };

        let previous = self
            .selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(option));
        let changed = previous.is_none_or(|p| instance_key(&p) != instance_key(option));
        if changed {
            debug!(dispatch = %self.id, ?key, option = %option.id(), "dispatch selection changed");
            option.reset();
        }
        vec![Arc::clone(option)]
    }

    fn validate(&self) -> Result<(), HumanoidError> {
        if self.options.is_empty() {
            return Err(HumanoidError::EmptyComposite {
                kind: "Dispatch".to_string(),
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}
