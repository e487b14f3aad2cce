// tests/timing.rs

use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use profilerun::engine::{EventBus, ProfileEvent, ProfileTiming, TimingMode};
use profilerun::errors::AgentError;
use profilerun::types::DeterminismScope;

type TestResult = Result<(), Box<dyn Error>>;

fn iteration_end(iteration: u64) -> ProfileEvent {
    ProfileEvent::IterationEnd { iteration }
}

fn action_end() -> ProfileEvent {
    ProfileEvent::ActionEnd {
        component_type: "Recording".to_string(),
        scenario: None,
    }
}

#[tokio::test]
async fn distant_deadlines_are_clamped() {
    let timing = ProfileTiming::timeout(Duration::from_secs(u64::MAX / 2));
    assert!(!timing.is_timed_out());
    assert_eq!(timing.duration(), Some(Duration::from_secs(u64::MAX / 2)));
    assert!(timing.deadline().is_some_and(|d| d > tokio::time::Instant::now()));

    let round = ProfileTiming::deterministic_timeout(Duration::MAX, DeterminismScope::AllActions);
    assert_eq!(round.determinism(), DeterminismScope::AllActions);
}

#[test]
fn iterations_time_out_after_the_nth_iteration_end() -> TestResult {
    let events = EventBus::new();
    let timing = ProfileTiming::iterations(3)?;
    timing.subscribe(&events);

    events.publish(&iteration_end(1));
    events.publish(&iteration_end(2));
    assert!(!timing.is_timed_out());

    events.publish(&iteration_end(3));
    assert!(timing.is_timed_out());

    events.publish(&iteration_end(4));
    assert!(timing.is_timed_out());
    assert_eq!(timing.iteration_count(), 4);
    Ok(())
}

#[test]
fn iterations_ignore_other_events() -> TestResult {
    let events = EventBus::new();
    let timing = ProfileTiming::iterations(1)?;
    timing.subscribe(&events);

    events.publish(&ProfileEvent::IterationBegin { iteration: 1 });
    events.publish(&action_end());
    events.publish(&ProfileEvent::BeforeExiting);
    assert!(!timing.is_timed_out());
    Ok(())
}

#[test]
fn unlimited_iterations_never_time_out() -> TestResult {
    let events = EventBus::new();
    let timing = ProfileTiming::iterations(-1)?;
    assert_eq!(timing.mode(), TimingMode::Iterations(None));
    timing.subscribe(&events);

    for i in 1..=100 {
        events.publish(&iteration_end(i));
    }
    assert!(!timing.is_timed_out());
    assert_eq!(timing.iteration_count(), 100);
    Ok(())
}

#[test]
fn zero_or_negative_iterations_are_rejected() {
    for n in [0, -2, -100] {
        match ProfileTiming::iterations(n) {
            Err(AgentError::InvalidTiming(msg)) => assert!(msg.contains(&n.to_string())),
            other => panic!("expected InvalidTiming for {n}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn individual_action_deadline_waits_for_an_action_end() {
    let events = EventBus::new();
    let timing =
        ProfileTiming::deterministic_timeout(Duration::ZERO, DeterminismScope::IndividualAction);
    timing.subscribe(&events);

    assert!(!timing.is_timed_out());
    events.publish(&ProfileEvent::ActionBegin {
        component_type: "Recording".to_string(),
        scenario: None,
    });
    events.publish(&iteration_end(1));
    assert!(!timing.is_timed_out());

    events.publish(&action_end());
    assert!(timing.is_timed_out());
}

#[tokio::test]
async fn all_actions_deadline_waits_for_an_iteration_end() {
    let events = EventBus::new();
    let timing = ProfileTiming::deterministic_timeout(Duration::ZERO, DeterminismScope::AllActions);
    timing.subscribe(&events);

    events.publish(&action_end());
    assert!(!timing.is_timed_out());

    events.publish(&iteration_end(1));
    assert!(timing.is_timed_out());
}

#[tokio::test]
async fn deterministic_deadline_in_the_future_is_not_reached_early() {
    let events = EventBus::new();
    let timing = ProfileTiming::deterministic_timeout(
        Duration::from_secs(3600),
        DeterminismScope::IndividualAction,
    );
    timing.subscribe(&events);

    events.publish(&action_end());
    assert!(!timing.is_timed_out());
}

#[tokio::test]
async fn plain_deadline_is_flipped_by_the_watcher() {
    let timing = ProfileTiming::timeout(Duration::from_millis(30))
        .with_poll_interval(Duration::from_millis(5));
    let cancel = CancellationToken::new();

    assert!(!timing.is_timed_out());
    tokio::time::timeout(Duration::from_secs(2), timing.wait_for_timeout(&cancel))
        .await
        .expect("deadline watcher should return");
    assert!(timing.is_timed_out());
}

#[tokio::test]
async fn forever_only_ends_on_cancellation() {
    let timing = ProfileTiming::forever();
    let cancel = CancellationToken::new();

    let pending = tokio::time::timeout(Duration::from_millis(50), timing.wait_for_timeout(&cancel)).await;
    assert!(pending.is_err());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), timing.wait_for_timeout(&cancel))
        .await
        .expect("cancelled watcher should return");
    assert!(!timing.is_timed_out());
}

#[tokio::test]
async fn monitor_timeout_unsubscribes_when_done() -> TestResult {
    let events = std::sync::Arc::new(EventBus::new());
    let timing = ProfileTiming::iterations(2)?.with_poll_interval(Duration::from_millis(5));
    let cancel = CancellationToken::new();

    let watcher = {
        let events = std::sync::Arc::clone(&events);
        let timing = timing.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { timing.monitor_timeout(&events, &cancel).await })
    };

    // Wait for the watcher to subscribe.
    while events.subscriber_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    events.publish(&iteration_end(1));
    events.publish(&iteration_end(2));

    tokio::time::timeout(Duration::from_secs(2), watcher).await??;
    assert!(timing.is_timed_out());
    assert_eq!(events.subscriber_count(), 0);
    Ok(())
}

#[test]
fn clones_share_the_timed_out_flag() -> TestResult {
    let events = EventBus::new();
    let timing = ProfileTiming::iterations(1)?;
    let observer = timing.clone();
    timing.subscribe(&events);

    events.publish(&iteration_end(1));
    assert!(observer.is_timed_out());
    Ok(())
}

#[test]
fn deadline_accessors_reflect_the_mode() {
    let timing =
        ProfileTiming::deterministic_timeout(Duration::from_secs(90), DeterminismScope::AllActions);
    assert_eq!(timing.duration(), Some(Duration::from_secs(90)));
    assert_eq!(timing.determinism(), DeterminismScope::AllActions);
    assert!(timing.deadline().is_some());

    let forever = ProfileTiming::forever();
    assert_eq!(forever.duration(), None);
    assert_eq!(forever.determinism(), DeterminismScope::None);
}
