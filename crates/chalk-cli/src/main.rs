// crates/chalk-cli/src/main.rs
// ============================================================================
// Module: Chalk CLI Entry Point
// Description: Command dispatcher for chalk insert and extract operations.
// Purpose: Wire plugins, seams, and the marking pipeline into one binary.
// Dependencies: chalk-core, chalk-providers, clap, serde, toml
// ============================================================================

//! ## Overview
//! The chalk CLI exposes the two logical operations: `insert` stamps marks
//! into (or alongside) artifacts under a target path, `extract` reads them
//! back. Both take a virtual-mode flag, repeatable `--env KEY=VALUE`
//! overrides, and an optional TOML config. The JSON report goes to stdout,
//! diagnostics go to stderr, and the exit code is non-zero when at least one
//! artifact hard-failed — the report stays complete for everything that
//! succeeded.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use chalk_core::CollectContext;
use chalk_core::EnvSnapshot;
use chalk_core::InsertOptions;
use chalk_core::RunOutcome;
use chalk_core::SystemClock;
use chalk_core::SystemEntropy;
use chalk_core::run_extract;
use chalk_core::run_insert;
use chalk_providers::CiPlugin;
use chalk_providers::CloudMetadataPlugin;
use chalk_providers::CloudProviderConfig;
use chalk_providers::CodeOwnersPlugin;
use chalk_providers::PluginRegistry;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Top-level chalk command line.
#[derive(Debug, Parser)]
#[command(name = "chalk", version, about = "Stamp and extract provenance marks on artifacts")]
struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    command: Command,
}

/// The two logical operations.
#[derive(Debug, Subcommand)]
enum Command {
    /// Insert marks into artifacts under the target path.
    Insert(OpArgs),
    /// Extract previously inserted marks under the target path.
    Extract(OpArgs),
}

/// Shared per-operation arguments.
#[derive(Debug, Args)]
struct OpArgs {
    /// Target path: a single artifact or a directory tree.
    path: PathBuf,
    /// Record marks in the side manifest, leaving artifacts untouched.
    #[arg(long = "virtual")]
    virtual_mode: bool,
    /// Environment override applied on top of the process environment.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env_overrides: Vec<String>,
    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// TOML configuration accepted via `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChalkConfig {
    /// Cloud metadata plugin configuration.
    cloud: CloudProviderConfig,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI-level failures that abort before or after the pipeline runs.
#[derive(Debug, Error)]
enum CliError {
    /// Malformed command-line input.
    #[error("invalid argument: {0}")]
    Args(String),
    /// Unreadable or unparsable configuration file.
    #[error("invalid config: {0}")]
    Config(String),
    /// Plugin wiring failed before the run started.
    #[error("plugin setup failed: {0}")]
    Plugin(String),
    /// The final report could not be written.
    #[error("cannot write chalk report: {0}")]
    Report(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Initializes diagnostics, runs the invocation, and maps failures to the
/// exit code.
fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            error!(failures, "run finished with hard per-artifact failures");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

/// Runs one invocation and returns the hard-failure count.
fn run(cli: Cli) -> Result<usize, CliError> {
    let (operation_is_insert, args) = match cli.command {
        Command::Insert(args) => (true, args),
        Command::Extract(args) => (false, args),
    };

    let overrides = parse_env_overrides(&args.env_overrides)?;
    let config = load_config(args.config.as_deref())?;
    let env = EnvSnapshot::from_process(&overrides);
    let scan_root = collect_root(&args.path);

    let registry = build_registry(config.cloud)?;
    let facts = registry.collect_all(&CollectContext::new(env, &scan_root));

    let outcome: RunOutcome = if operation_is_insert {
        run_insert(
            &args.path,
            InsertOptions {
                virtual_mode: args.virtual_mode,
            },
            &facts,
            &SystemClock,
            &mut SystemEntropy,
        )
    } else {
        run_extract(&args.path, &facts)
    };

    write_report(&outcome)?;
    Ok(outcome.hard_failures)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Registers the built-in enrichment plugins in their canonical order.
fn build_registry(cloud: CloudProviderConfig) -> Result<PluginRegistry, CliError> {
    let mut registry = PluginRegistry::new();
    registry.register(CiPlugin);
    registry
        .register(CloudMetadataPlugin::new(cloud).map_err(|err| CliError::Plugin(err.to_string()))?);
    registry.register(CodeOwnersPlugin);
    Ok(registry)
}

/// Parses repeated `KEY=VALUE` override arguments.
fn parse_env_overrides(raw: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    let mut overrides = BTreeMap::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(CliError::Args(format!("expected KEY=VALUE, got {entry}")));
        };
        if key.is_empty() {
            return Err(CliError::Args(format!("empty key in override {entry}")));
        }
        overrides.insert(key.to_string(), value.to_string());
    }
    Ok(overrides)
}

/// Loads the TOML configuration, defaulting when no file was given.
fn load_config(path: Option<&Path>) -> Result<ChalkConfig, CliError> {
    let Some(path) = path else {
        return Ok(ChalkConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|err| CliError::Config(format!("{}: {err}", path.display())))?;
    toml::from_str(&text).map_err(|err| CliError::Config(format!("{}: {err}", path.display())))
}

/// Resolves the root used for per-root probes (ownership declarations).
fn collect_root(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

/// Writes the final report to stdout; the only fatal step of an invocation.
fn write_report(outcome: &RunOutcome) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &outcome.report)
        .map_err(|err| CliError::Report(err.to_string()))?;
    stdout.write_all(b"\n").map_err(|err| CliError::Report(err.to_string()))
}
