// src/lib.rs

pub mod cli;
pub mod component;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod packages;
pub mod storage;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, parse_delimited_pairs};
use crate::component::{Component, Services};
use crate::config::loader::load_and_validate;
use crate::config::redact::obscure_secrets;
use crate::config::settings::AgentSettings;
use crate::engine::{ExecutorOptions, ProfileExecutor};
use crate::packages::FsPackageManager;
use crate::storage::FsBlobStore;

/// Default install location for packages, relative to the working directory.
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - profile loading and validation
/// - package manager, blob store and component services
/// - the profile executor and its timing policy
/// - Ctrl-C handling
pub async fn run(args: CliArgs, settings: AgentSettings) -> Result<()> {
    let profile = load_and_validate(&args.profile)?;
    info!(
        profile = %args.profile.display(),
        description = profile.description.as_deref().unwrap_or(""),
        "profile loaded"
    );

    let options = executor_options(&args, &settings)?;
    let services = build_services(&args, &settings);

    let mut executor =
        ProfileExecutor::new(profile, services.clone(), args.scenarios.clone()).with_options(options);

    if args.dry_run {
        executor.initialize()?;
        print_dry_run(&executor);
        return Ok(());
    }

    let timing = args.timing()?;
    let cancel = CancellationToken::new();

    // Ctrl-C -> graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    let outcome = executor.execute(timing, cancel).await;
    executor.dispose();
    outcome?;

    if services.reboot.is_requested() {
        warn!("a component requested a system reboot; the run ended early so the host can reboot");
    }
    Ok(())
}

/// Merge settings and CLI flags (CLI wins) into executor options.
fn executor_options(args: &CliArgs, settings: &AgentSettings) -> Result<ExecutorOptions> {
    let mut options = ExecutorOptions {
        execute_dependencies: !args.no_dependencies,
        execute_actions: !args.no_actions,
        execute_monitors: !args.no_monitors,
        fail_fast: args.fail_fast || settings.agent.fail_fast.unwrap_or(false),
        ..ExecutorOptions::default()
    };

    if let Some(seed) = args.seed.or(settings.agent.randomization_seed) {
        options.randomization_seed = seed;
    }

    let exit_wait = match args.exit_wait.as_deref() {
        Some(s) => Some(
            config::parse_duration(s).map_err(|e| anyhow::anyhow!("--exit-wait: {e}"))?,
        ),
        None => settings.exit_wait()?,
    };
    if let Some(exit_wait) = exit_wait {
        options.exit_wait = exit_wait;
    }

    options.metadata = settings.metadata.clone();
    if let Some(pairs) = args.metadata.as_deref() {
        options.metadata.merge(&parse_delimited_pairs(pairs)?, true);
    }
    if let Some(pairs) = args.parameters.as_deref() {
        options.parameters = parse_delimited_pairs(pairs)?;
    }

    debug!(?options, "executor options");
    Ok(options)
}

fn build_services(args: &CliArgs, settings: &AgentSettings) -> Services {
    let packages_dir = args
        .packages
        .clone()
        .or_else(|| settings.agent.packages_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PACKAGES_DIR));

    let mut services = Services::new(Arc::new(FsPackageManager::new(packages_dir)));

    let blob_dir = args
        .blob_store
        .clone()
        .or_else(|| settings.agent.blob_store_dir.clone());
    if let Some(dir) = blob_dir {
        services = services.with_blob_store(Arc::new(FsBlobStore::new(dir)));
    }

    services
}

/// Simple dry-run output: list the components that would run.
fn print_dry_run(executor: &ProfileExecutor) {
    let profile = executor.profile();
    println!("profilerun dry-run");
    if let Some(description) = &profile.description {
        println!("  description = {description}");
    }
    if let Some(interval) = profile.minimum_execution_interval {
        println!("  minimum_execution_interval = {interval:?}");
    }
    println!("  platform = {}", executor.services().platform);
    println!();

    print_components("dependencies", executor.dependencies());
    print_components("actions", executor.actions());
    print_components("monitors", executor.monitors());

    debug!("dry-run complete (no execution)");
}

fn print_components(label: &str, components: &[Arc<Component>]) {
    println!("{label} ({}):", components.len());
    for component in components {
        println!("  - {}", component.type_name());
        if let Some(scenario) = component.scenario() {
            println!("      scenario: {scenario}");
        }
        if component.fail_fast() {
            println!("      fail_fast: true");
        }
        for (key, value) in obscure_secrets(&component.parameters()).iter() {
            if !key.eq_ignore_ascii_case("Scenario") {
                println!("      {key}: {value}");
            }
        }
    }
}
