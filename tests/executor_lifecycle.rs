// tests/executor_lifecycle.rs

mod common;
use crate::common::{fast_executor, init_tracing, record_events};

use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use profilerun::config::ParameterValue;
use profilerun::engine::{ExecutorState, ProfileEvent, ProfileTiming};
use profilerun::types::ComponentKind;
use profilerun_test_utils::builders::{ElementBuilder, ProfileBuilder};
use profilerun_test_utils::fake_components::{FakeBehaviour, FakeComponents};
use profilerun_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

fn action_begin() -> ProfileEvent {
    ProfileEvent::ActionBegin {
        component_type: "Recording".to_string(),
        scenario: None,
    }
}

fn action_end() -> ProfileEvent {
    ProfileEvent::ActionEnd {
        component_type: "Recording".to_string(),
        scenario: None,
    }
}

fn quick_iterations(n: i64) -> ProfileTiming {
    ProfileTiming::iterations(n)
        .expect("valid iteration count")
        .with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn one_iteration_runs_dependencies_actions_and_monitors() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "A"))
        .action(ElementBuilder::named("Recording", "X"))
        .action(ElementBuilder::named("Recording", "Y"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    let events = record_events(executor.events());

    with_timeout(executor.execute(quick_iterations(1), CancellationToken::new())).await?;

    let trace = fakes.trace().entries();
    let workload: Vec<&str> = trace
        .iter()
        .map(String::as_str)
        .filter(|e| ["A", "X", "Y"].contains(e))
        .collect();
    assert_eq!(workload, vec!["A", "X", "Y"]);
    assert_eq!(trace.first().map(String::as_str), Some("A"));

    // The monitor was launched and then stopped during drain.
    assert!(fakes.trace().contains("M"));
    assert!(fakes.trace().contains("M:end"));

    assert_eq!(executor.state(), ExecutorState::Exited);
    assert_eq!(executor.iterations_started(), 1);

    let events = events.lock().unwrap().clone();
    let created = events
        .iter()
        .filter(|e| matches!(e, ProfileEvent::ComponentCreated { .. }))
        .count();
    assert_eq!(created, 4);

    let run_events: Vec<ProfileEvent> = events
        .into_iter()
        .filter(|e| !matches!(e, ProfileEvent::ComponentCreated { .. }))
        .collect();
    assert_eq!(
        run_events,
        vec![
            ProfileEvent::IterationBegin { iteration: 1 },
            action_begin(),
            action_end(),
            action_begin(),
            action_end(),
            ProfileEvent::IterationEnd { iteration: 1 },
            ProfileEvent::BeforeExiting,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn components_are_created_in_declared_kinds() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "A"))
        .action(ElementBuilder::named("Recording", "X"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    executor.initialize()?;
    // Idempotent.
    executor.initialize()?;

    assert_eq!(executor.dependencies().len(), 1);
    assert_eq!(executor.actions().len(), 1);
    assert_eq!(executor.monitors().len(), 1);
    assert_eq!(executor.dependencies()[0].kind(), ComponentKind::Dependency);
    assert_eq!(executor.actions()[0].kind(), ComponentKind::Action);
    assert_eq!(executor.monitors()[0].kind(), ComponentKind::Monitor);

    // Nothing ran.
    assert!(fakes.trace().entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn scenarios_include_actions_and_exclude_everywhere() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "dep-keep").scenario("Setup"))
        .dependency(ElementBuilder::named("Recording", "dep-drop").scenario("Skip"))
        .action(ElementBuilder::named("Recording", "a1").scenario("Run"))
        .action(ElementBuilder::named("Recording", "a2").scenario("Other"))
        .action(ElementBuilder::named("Recording", "a3").scenario("Skip"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "m1").scenario("Watch"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "m2").scenario("Skip"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &["Run", "-Skip"]);
    executor.initialize()?;

    let scenarios = |components: &[std::sync::Arc<profilerun::component::Component>]| {
        components
            .iter()
            .map(|c| c.scenario().unwrap_or_default().to_string())
            .collect::<Vec<_>>()
    };

    // Includes only apply to actions.
    assert_eq!(scenarios(executor.dependencies()), vec!["Setup"]);
    assert_eq!(scenarios(executor.actions()), vec!["Run"]);
    assert_eq!(scenarios(executor.monitors()), vec!["Watch"]);
    Ok(())
}

#[tokio::test]
async fn disabled_phases_are_not_built_or_run() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "A"))
        .action(ElementBuilder::named("Recording", "X"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    executor.options_mut().execute_dependencies = false;
    executor.options_mut().execute_monitors = false;

    with_timeout(executor.execute(quick_iterations(2), CancellationToken::new())).await?;

    assert!(executor.dependencies().is_empty());
    assert!(executor.monitors().is_empty());
    assert_eq!(fakes.trace().entries(), vec!["X", "X"]);
    Ok(())
}

#[tokio::test]
async fn monitors_only_run_until_the_deadline() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .monitor(ElementBuilder::named("BackgroundMonitor", "M1"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M2"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    let timing = ProfileTiming::timeout(Duration::from_millis(100))
        .with_poll_interval(Duration::from_millis(10));

    with_timeout(executor.execute(timing.clone(), CancellationToken::new())).await?;

    assert!(timing.is_timed_out());
    for entry in ["M1", "M1:end", "M2", "M2:end"] {
        assert!(fakes.trace().contains(entry), "missing {entry}");
    }
    assert_eq!(executor.iterations_started(), 0);
    Ok(())
}

#[tokio::test]
async fn external_cancellation_stops_a_forever_run() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let mut registry = fakes.registry();
    fakes.register(&mut registry, "LongAction", FakeBehaviour::Sleep(Duration::from_secs(30)));

    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("LongAction", "long"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M"))
        .build();

    let mut executor = fast_executor(profile, registry, &[]);
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    with_timeout(executor.execute(ProfileTiming::forever(), cancel)).await?;

    assert!(fakes.trace().contains("long"));
    assert!(!fakes.trace().contains("long:end"));
    assert!(fakes.trace().contains("M:end"));
    Ok(())
}

#[tokio::test]
async fn iteration_parameters_are_injected_before_each_action() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Recording", "X"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    with_timeout(executor.execute(quick_iterations(3), CancellationToken::new())).await?;

    let parameters = executor.actions()[0].parameters();
    assert_eq!(
        parameters.get("ProfileIteration"),
        Some(&ParameterValue::Integer(3))
    );
    assert!(
        parameters
            .get("ProfileIterationStartTime")
            .and_then(ParameterValue::as_i64)
            .is_some_and(|ms| ms > 0)
    );
    Ok(())
}

#[tokio::test]
async fn dispose_runs_once_per_component() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "A"))
        .action(ElementBuilder::named("Recording", "X"))
        .action(ElementBuilder::named("Recording", "Y"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "M"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    executor.initialize()?;

    executor.dispose();
    assert_eq!(fakes.disposals(), 4);
    assert!(executor.actions().iter().all(|c| c.is_disposed()));

    executor.dispose();
    drop(executor);
    assert_eq!(fakes.disposals(), 4);
    Ok(())
}

#[tokio::test]
async fn dropping_the_executor_disposes_components() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Recording", "X"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    executor.initialize()?;
    drop(executor);

    assert_eq!(fakes.disposals(), 1);
    Ok(())
}
