// src/engine/events.rs

//! Observer hooks published by the executor.
//!
//! Subscribers are plain callbacks invoked synchronously on the publishing
//! task, in subscription order. `ProfileTiming` uses this to count iterations
//! and action completions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::ComponentKind;

/// Events raised over the life of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    ComponentCreated {
        kind: ComponentKind,
        component_type: String,
        scenario: Option<String>,
    },
    ActionBegin {
        component_type: String,
        scenario: Option<String>,
    },
    ActionEnd {
        component_type: String,
        scenario: Option<String>,
    },
    IterationBegin {
        iteration: u64,
    },
    IterationEnd {
        iteration: u64,
    },
    BeforeExiting,
}

impl ProfileEvent {
    pub fn is_action_end(&self) -> bool {
        matches!(self, ProfileEvent::ActionEnd { .. })
    }

    pub fn is_iteration_end(&self) -> bool {
        matches!(self, ProfileEvent::IterationEnd { .. })
    }
}

pub type EventHandler = Arc<dyn Fn(&ProfileEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, EventHandler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ProfileEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.push((id, Arc::new(handler)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.retain(|(sid, _)| *sid != id);
        }
    }

    /// Deliver `event` to every subscriber.
    ///
    /// Handlers are cloned out before invocation so a handler may itself
    /// subscribe or unsubscribe.
    pub fn publish(&self, event: &ProfileEvent) {
        let handlers: Vec<EventHandler> = match self.handlers.read() {
            Ok(h) => h.iter().map(|(_, f)| Arc::clone(f)).collect(),
            Err(_) => return,
        };
        for handler in handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
