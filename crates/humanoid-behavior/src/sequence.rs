//! [`SequenceOption`] – runs its children one after another.
//!
//! Each cycle the sequence selects exactly one child.  It moves on to the
//! next child once the current one reports termination, resetting each child
//! as it is selected, and reports itself terminated after the last child has
//! finished.

use std::sync::{Arc, Mutex, PoisonError};

use humanoid_types::HumanoidError;
use tracing::{debug, error};

use crate::option::{BehaviorOption, OptionList, is_terminated};

pub struct SequenceOption {
    id: String,
    children: OptionList,
    /// `None` until the first run; `children.len()` once past the end.
    index: Mutex<Option<usize>>,
}

impl std::fmt::Debug for SequenceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceOption")
            .field("id", &self.id)
            .field("children", &self.children.iter().map(|c| c.id()).collect::<Vec<_>>())
            .field("index", &self.index)
            .finish()
    }
}

impl SequenceOption {
    /// # Errors
    ///
    /// [`HumanoidError::EmptyComposite`] when `children` is empty.
    pub fn new(id: impl Into<String>, children: OptionList) -> Result<Arc<Self>, HumanoidError> {
        let id = id.into();
        if children.is_empty() {
            error!(sequence = %id, "sequence needs at least one child");
            return Err(HumanoidError::EmptyComposite {
                kind: "Sequence".to_string(),
                id,
            });
        }
        Ok(Arc::new(Self {
            id,
            children,
            index: Mutex::new(None),
        }))
    }

    pub fn children(&self) -> &OptionList {
        &self.children
    }

    /// Position of the child currently selected, if started and not finished.
    pub fn current_index(&self) -> Option<usize> {
        self.index()
            .filter(|&i| i < self.children.len())
    }

    fn index(&self) -> Option<usize> {
        *self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_index(&self, index: usize) {
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = Some(index);
    }
}

impl BehaviorOption for SequenceOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "Sequence"
    }

    fn has_terminated(&self) -> f64 {
        match self.index() {
            Some(i) if i >= self.children.len() => 1.0,
            _ => 0.0,
        }
    }

    fn reset(&self) {
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn run_policy(&self) -> OptionList {
        // A fresh sequence always gives its first child one cycle.
        let Some(mut index) = self.index() else {
            let first = &self.children[0];
            first.reset();
            self.store_index(0);
            return vec![Arc::clone(first)];
        };

        while index < self.children.len() && is_terminated(self.children[index].as_ref()) {
            debug!(sequence = %self.id, child = %self.children[index].id(), "child finished");
            index += 1;
            if let Some(next) = self.children.get(index) {
                next.reset();
            }
        }
        self.store_index(index);

        match self.children.get(index) {
            Some(child) => vec![Arc::clone(child)],
            None => Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), HumanoidError> {
        if self.children.is_empty() {
            return Err(HumanoidError::EmptyComposite {
                kind: "Sequence".to_string(),
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}
