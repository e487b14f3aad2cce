// src/component/builtin/mod.rs

//! Component types available to every profile.

use super::registry::ComponentRegistry;

pub mod command;
pub mod monitor;
pub mod package;
pub mod wait;

pub use command::ExecuteCommand;
pub use monitor::ExecuteCommandMonitor;
pub use package::DependencyPackageInstallation;
pub use wait::WaitExecutor;

pub fn register_builtins(registry: &mut ComponentRegistry) {
    registry.register("ExecuteCommand", || Box::new(ExecuteCommand));
    registry.register("ExecuteCommandMonitor", || Box::new(ExecuteCommandMonitor));
    registry.register("WaitExecutor", || Box::new(WaitExecutor));
    registry.register("DependencyPackageInstallation", || {
        Box::new(DependencyPackageInstallation)
    });
}
