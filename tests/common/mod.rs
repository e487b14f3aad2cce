#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use profilerun::component::ComponentRegistry;
use profilerun::config::ExecutionProfile;
use profilerun::engine::{EventBus, ProfileEvent, ProfileExecutor};
use profilerun_test_utils::fake_components::test_services;

pub use profilerun_test_utils::init_tracing;

/// Executor over `registry` with short polling intervals.
pub fn fast_executor(
    profile: ExecutionProfile,
    registry: ComponentRegistry,
    scenarios: &[&str],
) -> ProfileExecutor {
    let mut executor = ProfileExecutor::new(
        profile,
        test_services(registry),
        scenarios.iter().map(|s| s.to_string()).collect(),
    );
    let options = executor.options_mut();
    options.action_poll_interval = Duration::from_millis(10);
    options.reboot_poll_interval = Duration::from_millis(20);
    options.exit_wait = Duration::from_secs(2);
    executor
}

/// Collect every event published on `events`.
pub fn record_events(events: &EventBus) -> Arc<Mutex<Vec<ProfileEvent>>> {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    events.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    recorded
}
