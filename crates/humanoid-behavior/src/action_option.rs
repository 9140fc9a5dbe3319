//! [`ActionOption`] – a leaf that runs a closure every time it is selected.

use std::sync::Arc;

use crate::option::{BehaviorOption, OptionList};

pub struct ActionOption {
    id: String,
    action: Box<dyn Fn() + Send + Sync>,
}

impl ActionOption {
    pub fn new<F>(id: impl Into<String>, action: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: id.into(),
            action: Box::new(action),
        })
    }
}

impl BehaviorOption for ActionOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &str {
        "Action"
    }

    fn run_policy(&self) -> OptionList {
        (self.action)();
        Vec::new()
    }
}
