// src/engine/executor.rs

//! The profile executor.
//!
//! Lifecycle of [`ProfileExecutor::execute`]:
//!
//! ```text
//! Created -> Initializing -> InstallingDependencies -> Running -> Draining -> Exited
//! ```
//!
//! - Dependencies run once, sequentially. A reboot request stops the run
//!   right after them.
//! - Actions run in a loop of iterations on their own task, throttled by the
//!   minimum execution interval.
//! - Monitors are launched once, concurrently, and joined at drain time.
//! - The run ends when actions finish (then monitors are given the same
//!   race), the timing policy times out, a reboot is requested, or the caller
//!   cancels. In-flight work then gets `exit_wait` to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use super::activity::ActivityContext;
use super::classify::{
    ActionDisposition, classify_action_error, classify_dependency_error, classify_monitor_error,
};
use super::events::{EventBus, ProfileEvent};
use super::timing::{ProfileTiming, deadline_after};
use crate::component::{Component, ComponentFactory, DEFAULT_RANDOMIZATION_SEED, ScenarioFilter, Services};
use crate::config::model::{ExecutionProfile, Metadata, Parameters};
use crate::errors::{AgentError, ComponentError, Result};
use crate::types::{ComponentKind, ErrorReason};

pub const DEFAULT_EXIT_WAIT: Duration = Duration::from_secs(10);
pub const DEFAULT_ACTION_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_REBOOT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Run options. Adjust before calling [`ProfileExecutor::execute`].
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub execute_actions: bool,
    pub execute_monitors: bool,
    pub execute_dependencies: bool,
    pub fail_fast: bool,
    /// Grace period for in-flight work once the run is stopping.
    pub exit_wait: Duration,
    pub randomization_seed: i64,
    /// Overrides the profile's `MinimumExecutionInterval` when set.
    pub execution_minimum_interval: Option<Duration>,
    /// Run-level metadata merged into every component.
    pub metadata: Metadata,
    /// Overrides for profile-level parameters.
    pub parameters: Parameters,
    pub action_poll_interval: Duration,
    pub reboot_poll_interval: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            execute_actions: true,
            execute_monitors: true,
            execute_dependencies: true,
            fail_fast: false,
            exit_wait: DEFAULT_EXIT_WAIT,
            randomization_seed: DEFAULT_RANDOMIZATION_SEED,
            execution_minimum_interval: None,
            metadata: Metadata::new(),
            parameters: Parameters::new(),
            action_poll_interval: DEFAULT_ACTION_POLL_INTERVAL,
            reboot_poll_interval: DEFAULT_REBOOT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Created,
    Initializing,
    InstallingDependencies,
    Running,
    Draining,
    Exited,
}

type PhaseResult = std::result::Result<(), ComponentError>;

/// A spawned actions or monitors phase whose outcome is kept once joined.
struct PhaseTask {
    handle: Option<JoinHandle<PhaseResult>>,
    outcome: Option<PhaseResult>,
}

impl PhaseTask {
    fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = PhaseResult> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
            outcome: None,
        }
    }

    fn idle() -> Self {
        Self {
            handle: None,
            outcome: Some(Ok(())),
        }
    }

    fn is_spawned(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for completion. Cancel safe.
    async fn join(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        let result = handle.await;
        self.handle = None;
        self.outcome = Some(match result {
            Ok(outcome) => outcome,
            Err(join_error) => Err(ComponentError::workload(
                ErrorReason::CriticalWorkloadFailure,
                "profile task terminated unexpectedly",
            )
            .with_source(join_error)),
        });
    }

    fn is_faulted(&self) -> bool {
        matches!(self.outcome, Some(Err(_)))
    }

    fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn take_error(&mut self) -> Option<ComponentError> {
        match self.outcome.take() {
            Some(Err(e)) => Some(e),
            other => {
                self.outcome = other;
                None
            }
        }
    }
}

/// Drives one profile run.
pub struct ProfileExecutor {
    profile: ExecutionProfile,
    services: Services,
    scenarios: Vec<String>,
    options: ExecutorOptions,
    events: Arc<EventBus>,
    iteration_counter: Arc<AtomicU64>,
    state: ExecutorState,
    initialized: bool,
    disposed: bool,
    dependencies: Vec<Arc<Component>>,
    actions: Vec<Arc<Component>>,
    monitors: Vec<Arc<Component>>,
}

impl ProfileExecutor {
    pub fn new(profile: ExecutionProfile, services: Services, scenarios: Vec<String>) -> Self {
        Self {
            profile,
            services,
            scenarios,
            options: ExecutorOptions::default(),
            events: Arc::new(EventBus::new()),
            iteration_counter: Arc::new(AtomicU64::new(0)),
            state: ExecutorState::Created,
            initialized: false,
            disposed: false,
            dependencies: Vec::new(),
            actions: Vec::new(),
            monitors: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ExecutorOptions {
        &mut self.options
    }

    /// Observer hooks. Subscribe before calling [`execute`](Self::execute).
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn profile(&self) -> &ExecutionProfile {
        &self.profile
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Iterations started so far.
    pub fn iterations_started(&self) -> u64 {
        self.iteration_counter.load(Ordering::SeqCst)
    }

    pub fn dependencies(&self) -> &[Arc<Component>] {
        &self.dependencies
    }

    pub fn actions(&self) -> &[Arc<Component>] {
        &self.actions
    }

    pub fn monitors(&self) -> &[Arc<Component>] {
        &self.monitors
    }

    fn global_metadata(&self) -> Metadata {
        let mut metadata = self.options.metadata.clone();
        metadata.merge(&self.profile.metadata, true);
        metadata
    }

    fn profile_parameters(&self) -> Parameters {
        let mut parameters = self.profile.parameters.clone();
        parameters.merge(&self.options.parameters, true);
        parameters
    }

    /// Build the component lists. Runs at most once; `execute` calls it
    /// when needed.
    ///
    /// Includes apply to actions only; excludes apply to all three lists.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.state = ExecutorState::Initializing;
        info!("Profile: Initialize");

        let filter = ScenarioFilter::from_scenarios(&self.scenarios);
        let excludes = filter.excludes_only();
        let metadata = self.global_metadata();
        let parameters = self.profile_parameters();

        let factory = ComponentFactory {
            registry: &self.services.registry,
            platform: self.services.platform,
            global_metadata: &metadata,
            profile_parameters: &parameters,
            fail_fast: self.options.fail_fast,
            randomization_seed: self.options.randomization_seed,
            events: &self.events,
        };

        let dependencies = if self.options.execute_dependencies {
            factory.create_components(ComponentKind::Dependency, &self.profile.dependencies, &excludes)?
        } else {
            Vec::new()
        };
        let actions = if self.options.execute_actions {
            factory.create_components(ComponentKind::Action, &self.profile.actions, &filter)?
        } else {
            Vec::new()
        };
        let monitors = if self.options.execute_monitors {
            factory.create_components(ComponentKind::Monitor, &self.profile.monitors, &excludes)?
        } else {
            Vec::new()
        };

        debug!(
            dependencies = dependencies.len(),
            actions = actions.len(),
            monitors = monitors.len(),
            "profile components created"
        );

        self.dependencies = dependencies;
        self.actions = actions;
        self.monitors = monitors;
        self.initialized = true;
        Ok(())
    }

    /// Run the profile to completion.
    ///
    /// Returns `Err` on a terminal failure. A reboot request ends the run
    /// early with `Ok`; check `services().reboot` afterwards.
    pub async fn execute(&mut self, timing: ProfileTiming, cancel: CancellationToken) -> Result<()> {
        let activity = ActivityContext::root();
        let span = activity.span("profile");
        let result = self.execute_inner(timing, cancel, activity).instrument(span).await;
        self.state = ExecutorState::Exited;
        result
    }

    async fn execute_inner(
        &mut self,
        timing: ProfileTiming,
        cancel: CancellationToken,
        activity: ActivityContext,
    ) -> Result<()> {
        // Linked to the caller's token; cancelled on our own when the run
        // ends so every component is asked to stop.
        let run_cancel = cancel.child_token();
        if run_cancel.is_cancelled() {
            return Ok(());
        }

        self.initialize()?;

        if self.options.execute_dependencies {
            self.install_dependencies(&activity, &run_cancel).await?;
        }

        if self.services.reboot.is_requested() {
            info!("Profile: reboot requested; skipping actions and monitors");
            return Ok(());
        }

        if !(self.options.execute_actions || self.options.execute_monitors) {
            return Ok(());
        }

        self.state = ExecutorState::Running;

        let stop = CancellationToken::new();
        let timing_subscription = timing.subscribe(&self.events);
        let timeout_watcher = self.spawn_timeout_watcher(&timing, &run_cancel, &stop);
        let reboot_watcher = self.spawn_reboot_watcher(&run_cancel, &stop);

        let mut monitors = self.start_monitors(&activity, &run_cancel);
        let mut actions = self.start_actions(&timing, &activity, &run_cancel);

        if actions.is_spawned() {
            tokio::select! {
                _ = actions.join() => {}
                _ = stop.cancelled() => {}
            }
            if !actions.is_faulted() && !stop.is_cancelled() {
                tokio::select! {
                    _ = monitors.join() => {}
                    _ = stop.cancelled() => {}
                }
            }
        } else if monitors.is_spawned() {
            tokio::select! {
                _ = monitors.join() => {}
                _ = stop.cancelled() => {}
            }
        }

        self.state = ExecutorState::Draining;
        run_cancel.cancel();
        timeout_watcher.abort();
        reboot_watcher.abort();
        if let Some(id) = timing_subscription {
            self.events.unsubscribe(id);
        }

        self.events.publish(&ProfileEvent::BeforeExiting);

        info!("Profile: Wait for Exit...");
        let drained = tokio::time::timeout(self.options.exit_wait, async {
            actions.join().await;
            monitors.join().await;
        })
        .await;
        if drained.is_err() {
            warn!(
                exit_wait_ms = self.options.exit_wait.as_millis() as u64,
                actions_finished = actions.is_finished(),
                monitors_finished = monitors.is_finished(),
                "exit wait elapsed; abandoning in-flight components"
            );
        }
        info!("Profile: Exited");

        if let Some(e) = actions.take_error() {
            return Err(AgentError::Component(e));
        }
        if let Some(e) = monitors.take_error() {
            return Err(AgentError::Component(e));
        }
        Ok(())
    }

    async fn install_dependencies(
        &mut self,
        parent: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.dependencies.is_empty() {
            return Ok(());
        }
        self.state = ExecutorState::InstallingDependencies;
        info!("Profile: Install Dependencies");

        let phase = parent.child();
        for dependency in &self.dependencies {
            if cancel.is_cancelled() || self.services.reboot.is_requested() {
                break;
            }

            let activity = phase.child();
            log_component_start("Dependency", dependency);
            let outcome = dependency
                .execute(&self.services, &activity, cancel)
                .instrument(activity.span("dependency"))
                .await;

            if let Err(err) = outcome {
                match classify_dependency_error(dependency, err) {
                    Some(e) => {
                        error!(component = %dependency.type_name(), error = %e, "dependency failed");
                        return Err(AgentError::Component(e));
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }

    fn spawn_timeout_watcher(
        &self,
        timing: &ProfileTiming,
        cancel: &CancellationToken,
        stop: &CancellationToken,
    ) -> JoinHandle<()> {
        let timing = timing.clone();
        let cancel = cancel.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            timing.wait_for_timeout(&cancel).await;
            if timing.is_timed_out() {
                info!("Profile: timing limit reached");
            }
            stop.cancel();
        })
    }

    fn spawn_reboot_watcher(&self, cancel: &CancellationToken, stop: &CancellationToken) -> JoinHandle<()> {
        let reboot = self.services.reboot.clone();
        let poll = self.options.reboot_poll_interval;
        let cancel = cancel.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            while !cancel.is_cancelled() && !reboot.is_requested() {
                tokio::select! {
                    _ = tokio::time::sleep(poll) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            if reboot.is_requested() {
                info!("Profile: reboot requested");
            }
            stop.cancel();
        })
    }

    fn start_actions(
        &self,
        timing: &ProfileTiming,
        parent: &ActivityContext,
        cancel: &CancellationToken,
    ) -> PhaseTask {
        if !self.options.execute_actions || self.actions.is_empty() {
            return PhaseTask::idle();
        }

        let action_loop = ActionLoop {
            actions: self.actions.clone(),
            services: self.services.clone(),
            events: Arc::clone(&self.events),
            timing: timing.clone(),
            counter: Arc::clone(&self.iteration_counter),
            minimum_interval: self
                .options
                .execution_minimum_interval
                .or(self.profile.minimum_execution_interval),
            poll_interval: self.options.action_poll_interval,
            fail_fast: self.options.fail_fast,
            parent: *parent,
            cancel: cancel.clone(),
        };
        PhaseTask::spawn(action_loop.run())
    }

    fn start_monitors(&self, parent: &ActivityContext, cancel: &CancellationToken) -> PhaseTask {
        if !self.options.execute_monitors || self.monitors.is_empty() {
            return PhaseTask::idle();
        }
        PhaseTask::spawn(run_monitors(
            self.monitors.clone(),
            self.services.clone(),
            parent.child(),
            cancel.clone(),
        ))
    }

    /// Dispose every created component exactly once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for component in self
            .actions
            .iter()
            .chain(self.dependencies.iter())
            .chain(self.monitors.iter())
        {
            component.dispose();
        }
        self.disposed = true;
    }
}

impl Drop for ProfileExecutor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ProfileExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileExecutor")
            .field("state", &self.state)
            .field("scenarios", &self.scenarios)
            .field("options", &self.options)
            .field("dependencies", &self.dependencies.len())
            .field("actions", &self.actions.len())
            .field("monitors", &self.monitors.len())
            .finish_non_exhaustive()
    }
}

fn log_component_start(label: &str, component: &Component) {
    match component.scenario() {
        Some(scenario) if !scenario.trim().is_empty() => info!(
            "Profile: {} = {} (scenario={})",
            label,
            component.type_name(),
            scenario
        ),
        _ => info!("Profile: {} = {}", label, component.type_name()),
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// State moved onto the actions task.
struct ActionLoop {
    actions: Vec<Arc<Component>>,
    services: Services,
    events: Arc<EventBus>,
    timing: ProfileTiming,
    counter: Arc<AtomicU64>,
    minimum_interval: Option<Duration>,
    poll_interval: Duration,
    fail_fast: bool,
    parent: ActivityContext,
    cancel: CancellationToken,
}

impl ActionLoop {
    async fn run(self) -> PhaseResult {
        info!("Profile: Execute Actions");

        let mut next_round: Option<Instant> = None;
        let mut is_first_action = true;

        while !self.cancel.is_cancelled() && !self.timing.is_timed_out() {
            if self.services.reboot.is_requested() {
                break;
            }

            let iteration = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let started_at = unix_millis();
            if let Some(interval) = self.minimum_interval {
                next_round = Some(deadline_after(Instant::now(), interval));
            }

            let activity = self.parent.child();
            self.events.publish(&ProfileEvent::IterationBegin { iteration });
            let outcome = self
                .run_iteration(iteration, started_at, next_round, &mut is_first_action, &activity)
                .instrument(activity.span("iteration"))
                .await;
            self.events.publish(&ProfileEvent::IterationEnd { iteration });

            outcome?;
        }

        Ok(())
    }

    async fn run_iteration(
        &self,
        iteration: u64,
        started_at: i64,
        next_round: Option<Instant>,
        is_first_action: &mut bool,
        iteration_activity: &ActivityContext,
    ) -> PhaseResult {
        debug!(iteration, "starting profile iteration");

        for action in &self.actions {
            if self.services.reboot.is_requested() || self.timing.is_timed_out() {
                break;
            }

            if !*is_first_action {
                if let Some(next) = next_round {
                    if !self.wait_until(next).await {
                        return Ok(());
                    }
                }
            }
            *is_first_action = false;

            if self.cancel.is_cancelled() {
                continue;
            }

            action.set_parameter("ProfileIteration", iteration as i64);
            action.set_parameter("ProfileIterationStartTime", started_at);

            let activity = iteration_activity.child();
            self.events.publish(&ProfileEvent::ActionBegin {
                component_type: action.type_name().to_string(),
                scenario: action.scenario().map(str::to_string),
            });
            log_component_start("Action", action);
            let outcome = action
                .execute(&self.services, &activity, &self.cancel)
                .instrument(activity.span("action"))
                .await;
            self.events.publish(&ProfileEvent::ActionEnd {
                component_type: action.type_name().to_string(),
                scenario: action.scenario().map(str::to_string),
            });

            if let Err(err) = outcome {
                match classify_action_error(action, err, self.fail_fast) {
                    ActionDisposition::Continue(Some(e)) => {
                        warn!(
                            component = %action.type_name(),
                            reason = %e.reason,
                            error = %e,
                            "action failed with a non-terminal error; continuing"
                        );
                    }
                    ActionDisposition::Continue(None) => {}
                    ActionDisposition::Abort(e) => {
                        error!(component = %action.type_name(), error = %e, "action failed");
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Poll until `next`, stopping early on timeout. Returns `false` if the
    /// run was cancelled while waiting.
    async fn wait_until(&self, next: Instant) -> bool {
        while !self.timing.is_timed_out() {
            let now = Instant::now();
            if now >= next {
                break;
            }
            let step = self.poll_interval.min(next - now);
            tokio::select! {
                _ = tokio::time::sleep(step) => {}
                _ = self.cancel.cancelled() => return false,
            }
        }
        true
    }
}

async fn run_monitors(
    monitors: Vec<Arc<Component>>,
    services: Services,
    phase: ActivityContext,
    cancel: CancellationToken,
) -> PhaseResult {
    info!("Profile: Execute Monitors");

    let mut running = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        if services.reboot.is_requested() {
            break;
        }
        if cancel.is_cancelled() {
            continue;
        }

        log_component_start("Monitor", &monitor);
        let activity = phase.child();
        let services = services.clone();
        let cancel = cancel.clone();
        let component = Arc::clone(&monitor);
        let handle = tokio::spawn(
            async move { component.execute(&services, &activity, &cancel).await }
                .instrument(activity.span("monitor")),
        );
        running.push((monitor, handle));
    }

    let mut first_error = None;
    for (monitor, handle) in running {
        let failure = match handle.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => classify_monitor_error(&monitor, err),
            Err(join_error) => Some(
                ComponentError::monitor(
                    ErrorReason::MonitorFailed,
                    format!("Monitor execution failed for component '{}'.", monitor.type_name()),
                )
                .with_source(join_error),
            ),
        };
        if let Some(e) = failure {
            error!(component = %monitor.type_name(), error = %e, "monitor failed");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
