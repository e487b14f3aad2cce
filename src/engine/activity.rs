// src/engine/activity.rs

//! Correlation ids for structured logs.
//!
//! The executor opens an activity at run start and a child activity for each
//! phase, iteration and component invocation. Each activity is attached to a
//! `tracing` span so that log lines can be stitched back together.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityContext {
    pub activity_id: Uuid,
    pub parent_activity_id: Option<Uuid>,
}

impl ActivityContext {
    /// A new root activity.
    pub fn root() -> Self {
        Self {
            activity_id: Uuid::new_v4(),
            parent_activity_id: None,
        }
    }

    pub fn child(&self) -> Self {
        Self {
            activity_id: Uuid::new_v4(),
            parent_activity_id: Some(self.activity_id),
        }
    }

    /// An info-level span carrying both ids.
    pub fn span(&self, name: &'static str) -> tracing::Span {
        let parent = self
            .parent_activity_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        tracing::info_span!(
            "activity",
            name,
            activity_id = %self.activity_id,
            parent_activity_id = %parent
        )
    }
}

impl Default for ActivityContext {
    fn default() -> Self {
        Self::root()
    }
}
