#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use profilerun::component::{
    ComponentFuture, ComponentHandler, ComponentRegistry, ExecutionContext, Services,
};
use profilerun::errors::{ComponentError, ExecutionError};
use profilerun::fs::mock::MockFileSystem;
use profilerun::packages::FsPackageManager;
use profilerun::storage::RetryPolicy;
use profilerun::types::ErrorReason;

/// Ordered log of what the fake components did, shared across clones.
#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace(Arc<Mutex<Vec<String>>>);

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }
}

/// What a fake component does when executed.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    Succeed,
    Fail(ErrorReason),
    ExtensionMismatch,
    Unexpected,
    /// Sleep, stopping early with `Cancelled` on cancellation.
    Sleep(Duration),
    /// Sleep, ignoring cancellation.
    SleepUninterruptible(Duration),
    RequestReboot,
    /// Run until cancelled (the shape of a monitor).
    RunUntilCancelled,
}

/// A component handler driven by a [`FakeBehaviour`].
///
/// Records the element's `Name` parameter (falling back to the type name)
/// when it starts, and `<name>:end` when a sleeping or long-running
/// behaviour completes.
pub struct FakeComponent {
    behaviour: FakeBehaviour,
    trace: ExecutionTrace,
    disposals: Arc<AtomicUsize>,
}

impl ComponentHandler for FakeComponent {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a> {
        Box::pin(async move {
            let name = ctx
                .parameter_str("Name")
                .unwrap_or(&ctx.component_type)
                .to_string();
            self.trace.record(name.clone());

            match &self.behaviour {
                FakeBehaviour::Succeed => Ok(()),
                FakeBehaviour::Fail(reason) => Err(ComponentError::new(
                    ctx.failure_kind(),
                    *reason,
                    format!("{name} failed on purpose"),
                )
                .into()),
                FakeBehaviour::ExtensionMismatch => Err(ExecutionError::ExtensionMismatch(
                    format!("{name} is missing a member"),
                )),
                FakeBehaviour::Unexpected => Err(ExecutionError::Unexpected(
                    std::io::Error::other(format!("{name} blew up")).into(),
                )),
                FakeBehaviour::Sleep(duration) => {
                    tokio::select! {
                        _ = tokio::time::sleep(*duration) => {
                            self.trace.record(format!("{name}:end"));
                            Ok(())
                        }
                        _ = ctx.cancel.cancelled() => Err(ExecutionError::Cancelled),
                    }
                }
                FakeBehaviour::SleepUninterruptible(duration) => {
                    tokio::time::sleep(*duration).await;
                    self.trace.record(format!("{name}:end"));
                    Ok(())
                }
                FakeBehaviour::RequestReboot => {
                    ctx.services.reboot.request();
                    Ok(())
                }
                FakeBehaviour::RunUntilCancelled => {
                    ctx.cancel.cancelled().await;
                    self.trace.record(format!("{name}:end"));
                    Ok(())
                }
            }
        })
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory for fake component types sharing one trace and disposal counter.
#[derive(Debug, Clone, Default)]
pub struct FakeComponents {
    trace: ExecutionTrace,
    disposals: Arc<AtomicUsize>,
}

impl FakeComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    pub fn register(&self, registry: &mut ComponentRegistry, type_name: &str, behaviour: FakeBehaviour) {
        let trace = self.trace.clone();
        let disposals = Arc::clone(&self.disposals);
        registry.register(type_name, move || {
            Box::new(FakeComponent {
                behaviour: behaviour.clone(),
                trace: trace.clone(),
                disposals: Arc::clone(&disposals),
            }) as Box<dyn ComponentHandler>
        });
    }

    /// A registry with the common fakes: `Recording`, `RebootRequest` and
    /// `BackgroundMonitor`.
    pub fn registry(&self) -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        self.register(&mut registry, "Recording", FakeBehaviour::Succeed);
        self.register(&mut registry, "RebootRequest", FakeBehaviour::RequestReboot);
        self.register(&mut registry, "BackgroundMonitor", FakeBehaviour::RunUntilCancelled);
        registry
    }
}

/// Services over an in-memory package store, with retries disabled.
pub fn test_services(registry: ComponentRegistry) -> Services {
    let packages = FsPackageManager::with_fs(PathBuf::from("/packages"), Arc::new(MockFileSystem::new()));
    Services::new(Arc::new(packages))
        .with_registry(registry)
        .with_retry_policy(RetryPolicy::none())
}
