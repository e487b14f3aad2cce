// tests/cli.rs

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use profilerun::cli::{CliArgs, LogLevel, parse_delimited_pairs, parse_timeout};
use profilerun::engine::TimingMode;
use profilerun::errors::AgentError;
use profilerun::logging::select_filter;
use profilerun::types::DeterminismScope;

type TestResult = Result<(), Box<dyn Error>>;

fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse_from(std::iter::once("profilerun").chain(args.iter().copied()))
}

#[test]
fn minimal_invocation_uses_defaults() -> TestResult {
    let args = parse(&["--profile", "PERF-IO.json"])?;

    assert_eq!(args.profile, PathBuf::from("PERF-IO.json"));
    assert_eq!(args.settings, PathBuf::from("profilerun.toml"));
    assert!(args.scenarios.is_empty());
    assert!(!args.fail_fast && !args.dry_run);
    assert!(args.log_level.is_none());
    assert_eq!(args.timing()?.mode(), TimingMode::Forever);
    Ok(())
}

#[test]
fn profile_is_required() {
    assert!(parse(&["--iterations", "1"]).is_err());
}

#[test]
fn scenarios_accept_exclusions() -> TestResult {
    let args = parse(&["--profile", "p.json", "--scenarios", "Fio,-Stress", "--scenarios", "-Cooldown"])?;
    assert_eq!(args.scenarios, vec!["Fio", "-Stress", "-Cooldown"]);
    Ok(())
}

#[test]
fn timeout_and_iterations_conflict() {
    assert!(parse(&["--profile", "p.json", "--timeout", "5", "--iterations", "2"]).is_err());
}

#[test]
fn iterations_select_the_iteration_policy() -> TestResult {
    let args = parse(&["--profile", "p.json", "--iterations", "3"])?;
    assert_eq!(args.timing()?.mode(), TimingMode::Iterations(Some(3)));

    let args = parse(&["--profile", "p.json", "--iterations", "-1"])?;
    assert_eq!(args.timing()?.mode(), TimingMode::Iterations(None));

    let args = parse(&["--profile", "p.json", "--iterations", "0"])?;
    assert!(matches!(args.timing(), Err(AgentError::InvalidTiming(_))));
    Ok(())
}

#[test]
fn other_flags_are_parsed() -> TestResult {
    let args = parse(&[
        "--profile",
        "p.yaml",
        "--fail-fast",
        "--exit-wait",
        "30s",
        "--seed",
        "-5",
        "--packages",
        "/opt/packages",
        "--blob-store",
        "/opt/blobs",
        "--no-monitors",
        "--log-level",
        "debug",
        "--dry-run",
    ])?;

    assert!(args.fail_fast);
    assert_eq!(args.exit_wait.as_deref(), Some("30s"));
    assert_eq!(args.seed, Some(-5));
    assert_eq!(args.packages, Some(PathBuf::from("/opt/packages")));
    assert_eq!(args.blob_store, Some(PathBuf::from("/opt/blobs")));
    assert!(args.no_monitors && !args.no_actions && !args.no_dependencies);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    Ok(())
}

#[test]
fn timeout_in_minutes_or_as_a_duration() -> TestResult {
    let minutes = parse_timeout("90")?;
    assert_eq!(minutes.duration(), Some(Duration::from_secs(90 * 60)));
    assert_eq!(minutes.determinism(), DeterminismScope::None);

    let clock = parse_timeout("01:30:00")?;
    assert_eq!(clock.duration(), Some(Duration::from_secs(90 * 60)));

    let short = parse_timeout("45s")?;
    assert_eq!(short.duration(), Some(Duration::from_secs(45)));
    Ok(())
}

#[test]
fn timeout_determinism_suffix() -> TestResult {
    let action = parse_timeout("10/deterministic")?;
    assert_eq!(action.duration(), Some(Duration::from_secs(600)));
    assert_eq!(action.determinism(), DeterminismScope::IndividualAction);

    let round = parse_timeout("00:05:00/Deterministic*")?;
    assert_eq!(round.duration(), Some(Duration::from_secs(300)));
    assert_eq!(round.determinism(), DeterminismScope::AllActions);
    Ok(())
}

#[test]
fn bad_timeouts_are_rejected() {
    for value in ["soon", "10/eventually", "", "-5"] {
        assert!(
            matches!(parse_timeout(value), Err(AgentError::InvalidTiming(_))),
            "'{value}' should be rejected"
        );
    }
}

#[test]
fn oversized_timeouts_are_rejected() {
    for value in ["307445734561825861", "307445734561825861/deterministic", "18446744073709551615h"] {
        assert!(
            matches!(parse_timeout(value), Err(AgentError::InvalidTiming(_))),
            "'{value}' should be rejected"
        );
    }
}

#[test]
fn delimited_pairs() -> TestResult {
    let pairs = parse_delimited_pairs("Threads=8,,,Label=a=b,,, Owner = perf ,,,")?;

    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs.get_str("threads"), Some("8"));
    assert_eq!(pairs.get_str("Label"), Some("a=b"));
    assert_eq!(pairs.get_str("Owner"), Some("perf"));

    assert!(parse_delimited_pairs("")?.is_empty());
    Ok(())
}

#[test]
fn malformed_pairs_are_rejected() {
    assert!(matches!(
        parse_delimited_pairs("Threads"),
        Err(AgentError::ConfigError(_))
    ));
    assert!(matches!(
        parse_delimited_pairs("=8"),
        Err(AgentError::ConfigError(_))
    ));
}

#[test]
fn log_filter_sources() {
    assert!(select_filter(Some(LogLevel::Trace), Some("not a filter ="), None).is_ok());
    assert!(select_filter(None, Some("profilerun::engine=debug,info"), None).is_ok());
    assert!(select_filter(None, None, None).is_ok());

    let err = select_filter(None, Some(" "), Some("profilerun=loud")).unwrap_err();
    assert!(err.to_string().contains("settings log_level"));
}
