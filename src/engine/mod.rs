// src/engine/mod.rs

//! Profile execution engine.
//!
//! This module ties together:
//! - the [`ProfileExecutor`] lifecycle (dependencies, actions loop, monitors,
//!   graceful exit)
//! - [`ProfileTiming`], the stopping oracle consulted by the actions loop
//! - the observer [`EventBus`] and the events it carries
//! - failure classification
//! - activity correlation ids and the process-wide reboot flag

pub mod activity;
pub mod classify;
pub mod events;
pub mod executor;
pub mod signals;
pub mod timing;

pub use activity::ActivityContext;
pub use classify::ActionDisposition;
pub use events::{EventBus, EventHandler, ProfileEvent, SubscriptionId};
pub use executor::{ExecutorOptions, ExecutorState, ProfileExecutor};
pub use signals::RebootFlag;
pub use timing::{ProfileTiming, TimingMode};
