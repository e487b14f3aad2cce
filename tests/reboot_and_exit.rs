// tests/reboot_and_exit.rs

mod common;
use crate::common::{fast_executor, init_tracing};

use std::error::Error;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use profilerun::engine::ProfileTiming;
use profilerun::types::DeterminismScope;
use profilerun_test_utils::builders::{ElementBuilder, ProfileBuilder};
use profilerun_test_utils::fake_components::{FakeBehaviour, FakeComponents};
use profilerun_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn reboot_requested_by_a_dependency_skips_the_rest() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .dependency(ElementBuilder::named("Recording", "dep-1"))
        .dependency(ElementBuilder::named("RebootRequest", "dep-2"))
        .dependency(ElementBuilder::named("Recording", "dep-3"))
        .action(ElementBuilder::named("Recording", "action"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "monitor"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    with_timeout(executor.execute(ProfileTiming::forever(), CancellationToken::new())).await?;

    assert_eq!(fakes.trace().entries(), vec!["dep-1", "dep-2"]);
    assert!(executor.services().reboot.is_requested());
    assert_eq!(executor.iterations_started(), 0);
    Ok(())
}

#[tokio::test]
async fn reboot_requested_by_an_action_stops_the_loop() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Recording", "first"))
        .action(ElementBuilder::named("RebootRequest", "reboot"))
        .action(ElementBuilder::named("Recording", "never"))
        .monitor(ElementBuilder::named("BackgroundMonitor", "monitor"))
        .build();

    let mut executor = fast_executor(profile, fakes.registry(), &[]);
    with_timeout(executor.execute(ProfileTiming::forever(), CancellationToken::new())).await?;

    assert!(executor.services().reboot.is_requested());
    assert!(!fakes.trace().contains("never"));
    assert_eq!(fakes.trace().count("first"), 1);
    assert!(fakes.trace().contains("monitor:end"));
    assert_eq!(executor.iterations_started(), 1);
    Ok(())
}

#[tokio::test]
async fn in_flight_action_is_given_the_exit_wait_to_finish() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let mut registry = fakes.registry();
    fakes.register(
        &mut registry,
        "Stubborn",
        FakeBehaviour::SleepUninterruptible(Duration::from_millis(300)),
    );

    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Stubborn", "slow"))
        .build();

    let mut executor = fast_executor(profile, registry, &[]);
    executor.options_mut().exit_wait = Duration::from_secs(3);
    let timing = ProfileTiming::timeout(Duration::from_millis(50))
        .with_poll_interval(Duration::from_millis(10));

    let started = Instant::now();
    with_timeout(executor.execute(timing.clone(), CancellationToken::new())).await?;

    assert!(timing.is_timed_out());
    assert!(fakes.trace().contains("slow:end"));
    assert!(started.elapsed() >= Duration::from_millis(250));
    Ok(())
}

#[tokio::test]
async fn work_outliving_the_exit_wait_is_abandoned() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let mut registry = fakes.registry();
    fakes.register(
        &mut registry,
        "Stubborn",
        FakeBehaviour::SleepUninterruptible(Duration::from_secs(5)),
    );

    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Stubborn", "slow"))
        .build();

    let mut executor = fast_executor(profile, registry, &[]);
    executor.options_mut().exit_wait = Duration::from_millis(100);
    let timing = ProfileTiming::timeout(Duration::from_millis(50))
        .with_poll_interval(Duration::from_millis(10));

    let started = Instant::now();
    with_timeout(executor.execute(timing, CancellationToken::new())).await?;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!fakes.trace().contains("slow:end"));
    Ok(())
}

#[tokio::test]
async fn deterministic_deadline_lets_the_running_action_finish() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let mut registry = fakes.registry();
    fakes.register(
        &mut registry,
        "Stubborn",
        FakeBehaviour::SleepUninterruptible(Duration::from_millis(200)),
    );

    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Stubborn", "first"))
        .action(ElementBuilder::named("Recording", "second"))
        .build();

    let mut executor = fast_executor(profile, registry, &[]);
    let timing = ProfileTiming::deterministic_timeout(
        Duration::from_millis(50),
        DeterminismScope::IndividualAction,
    )
    .with_poll_interval(Duration::from_millis(10));

    with_timeout(executor.execute(timing.clone(), CancellationToken::new())).await?;

    assert!(timing.is_timed_out());
    assert_eq!(fakes.trace().entries(), vec!["first", "first:end"]);
    Ok(())
}

#[tokio::test]
async fn deterministic_all_actions_deadline_finishes_the_round() -> TestResult {
    init_tracing();

    let fakes = FakeComponents::new();
    let mut registry = fakes.registry();
    fakes.register(
        &mut registry,
        "Stubborn",
        FakeBehaviour::SleepUninterruptible(Duration::from_millis(200)),
    );

    let profile = ProfileBuilder::new()
        .action(ElementBuilder::named("Stubborn", "first"))
        .action(ElementBuilder::named("Recording", "second"))
        .build();

    let mut executor = fast_executor(profile, registry, &[]);
    let timing = ProfileTiming::deterministic_timeout(
        Duration::from_millis(50),
        DeterminismScope::AllActions,
    )
    .with_poll_interval(Duration::from_millis(10));

    with_timeout(executor.execute(timing.clone(), CancellationToken::new())).await?;

    assert!(timing.is_timed_out());
    assert_eq!(
        fakes.trace().entries(),
        vec!["first", "first:end", "second"]
    );
    assert_eq!(executor.iterations_started(), 1);
    Ok(())
}
