// src/component/services.rs

use std::sync::Arc;

use super::expression::{ExpressionEvaluator, ProfileExpressionEvaluator};
use super::platform::Platform;
use super::registry::ComponentRegistry;
use crate::engine::signals::RebootFlag;
use crate::packages::PackageManager;
use crate::storage::{BlobStore, EnvSecretStore, RetryPolicy, SecretStore};

/// Shared collaborators handed to the executor and to every component.
///
/// Cloning is cheap; all members are shared handles.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<ComponentRegistry>,
    pub packages: Arc<dyn PackageManager>,
    pub blobs: Option<Arc<dyn BlobStore>>,
    pub secrets: Arc<dyn SecretStore>,
    pub evaluator: Arc<dyn ExpressionEvaluator>,
    pub platform: Platform,
    pub reboot: RebootFlag,
    pub retry: RetryPolicy,
}

impl Services {
    /// Services with the built-in component types, no blob store, secrets
    /// from the environment and the current platform.
    pub fn new(packages: Arc<dyn PackageManager>) -> Self {
        Self {
            registry: Arc::new(ComponentRegistry::with_builtins()),
            packages,
            blobs: None,
            secrets: Arc::new(EnvSecretStore::new()),
            evaluator: Arc::new(ProfileExpressionEvaluator),
            platform: Platform::current(),
            reboot: RebootFlag::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn with_secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_reboot_flag(mut self, reboot: RebootFlag) -> Self {
        self.reboot = reboot;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("registry", &self.registry)
            .field("packages", &self.packages)
            .field("blobs", &self.blobs)
            .field("platform", &self.platform)
            .field("reboot", &self.reboot)
            .finish_non_exhaustive()
    }
}
