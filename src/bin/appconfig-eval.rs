//! CLI binary for inspecting feature flags and limits in a configuration file.
//!
//! This binary evaluates flags the same way the library does, against a JSON
//! or YAML configuration file, without any service around it.
//!
//! # Commands
//!
//! - `enabled`: Evaluate a feature, globally or for one user
//! - `feature` / `features`: Show the status of one or all features
//! - `limits` / `cache`: Show operational limits and cache settings
//! - `keys` / `get` / `stats` / `refresh`: Inspect the configuration snapshot
//! - `bucket` / `rollout`: Inspect rollout bucketing
//! - `test`: Run an expectation suite from a JSON file

use appconfig_evaluator::keys::DEFAULT_APP_NAME;
use appconfig_evaluator::provider::{ConfigSource, FileSource, SnapshotProvider, StaticSource};
use appconfig_evaluator::types::to_json_string;
use appconfig_evaluator::{bucket, in_rollout, ConfigSnapshot, EvaluatorError, FlagEvaluator};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// CLI for evaluating feature flags and limits from an AppConfig document
#[derive(Parser)]
#[command(name = "appconfig-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(short, long, env = "APPCONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Application name used in `services.<app>` keys
    #[arg(short, long, env = "APPCONFIG_APP", default_value = DEFAULT_APP_NAME, global = true)]
    app: String,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    /// Show debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate whether a feature is enabled
    Enabled {
        /// Feature name
        feature: String,

        /// Evaluate for this user identity, applying the rollout percentage
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show the configured status of one feature
    Feature {
        /// Feature name
        feature: String,
    },

    /// Show the status of every configured feature
    Features,

    /// Show request limits
    Limits,

    /// Show cache settings
    Cache,

    /// List all configuration keys
    Keys,

    /// Show one raw configuration value
    Get {
        /// Full dotted configuration key
        key: String,
    },

    /// Show snapshot statistics
    Stats,

    /// Reload the configuration file and report the new version
    Refresh,

    /// Show the rollout bucket of a user
    Bucket {
        /// User identity
        user: String,
    },

    /// Simulate a rollout percentage over synthetic users
    Rollout {
        /// Rollout percentage
        percentage: i64,

        /// Number of synthetic users (`user-0` .. `user-N`)
        #[arg(short = 'n', long, default_value_t = 10_000)]
        users: u32,
    },

    /// Run an expectation suite from a JSON file
    Test {
        /// Path to the test suite JSON file
        test_file: String,
    },
}

/// Test case definition for expectation suites
#[derive(Debug, Deserialize)]
struct TestCase {
    description: String,
    feature: String,
    #[serde(default)]
    user: Option<String>,
    expected: bool,
}

/// Expectation suite definition
///
/// `config` holds an inline configuration document. Without it, the file
/// given with `--config` is used.
#[derive(Debug, Deserialize)]
struct TestSuite {
    name: String,
    #[serde(default)]
    config: Option<Value>,
    tests: Vec<TestCase>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RolloutSimulation {
    rollout_percentage: i64,
    users: u32,
    enabled: u32,
    enabled_fraction: f64,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn provider_for(source: Arc<dyn ConfigSource>) -> Result<Arc<SnapshotProvider>, String> {
    SnapshotProvider::new(source)
        .map(Arc::new)
        .map_err(|e| e.message)
}

/// Builds an evaluator over the configuration file.
fn load_evaluator(config: Option<&Path>, app: &str) -> Result<FlagEvaluator, String> {
    let path = config.ok_or_else(|| {
        "No configuration file given (use --config or APPCONFIG_FILE)".to_string()
    })?;
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    let provider = provider_for(Arc::new(FileSource::new(path)))?;
    Ok(FlagEvaluator::for_app(provider, app))
}

fn print_result(label: &str, view: &impl Serialize, pretty: bool) {
    println!("{} {}", "✓".green(), label);
    println!("Result: {}", to_json_string(view, pretty));
}

/// Run the enabled command.
fn run_enabled(
    evaluator: &FlagEvaluator,
    feature: &str,
    user: Option<&str>,
    pretty: bool,
) -> Result<(), String> {
    let start = Instant::now();
    let enabled = match user {
        Some(user) => evaluator
            .is_feature_enabled_for_user(feature, user)
            .map_err(|e| e.message)?,
        None => evaluator.is_feature_enabled(feature),
    };
    let duration = start.elapsed();

    let mut result = json!({"feature": feature, "enabled": enabled});
    if let Some(user) = user {
        result["user"] = json!(user);
        result["bucket"] = json!(bucket(user));
        result["rolloutPercentage"] = json!(evaluator.rollout_percentage(feature));
    }

    let marker = if enabled { "✓".green() } else { "✗".yellow() };
    let state = if enabled { "enabled" } else { "disabled" };
    println!("{} Feature '{}' is {}", marker, feature, state);
    println!("Result: {}", to_json_string(&result, pretty));
    println!("Time: {:?}", duration);
    Ok(())
}

/// Run the rollout command.
fn run_rollout(percentage: i64, users: u32, pretty: bool) -> Result<(), String> {
    if users == 0 {
        return Err("At least one user is required".to_string());
    }
    let enabled = (0..users)
        .filter(|i| in_rollout(&format!("user-{}", i), percentage))
        .count() as u32;

    let simulation = RolloutSimulation {
        rollout_percentage: percentage,
        users,
        enabled,
        enabled_fraction: f64::from(enabled) / f64::from(users),
    };
    print_result(
        &format!("{} of {} users enabled", enabled, users),
        &simulation,
        pretty,
    );
    Ok(())
}

/// Run the test command.
fn run_test(
    test_file: &str,
    config: Option<&Path>,
    app: &str,
    verbose: bool,
) -> Result<(), String> {
    let path = Path::new(test_file);
    if !path.exists() {
        return Err(format!("Test file not found: {}", test_file));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read test file '{}': {}", test_file, e))?;

    let suite: TestSuite = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse test suite '{}': {}", test_file, e))?;

    let evaluator = match suite.config {
        Some(document) => {
            let values = ConfigSnapshot::flatten_document(document).map_err(|e| e.message)?;
            let provider = provider_for(Arc::new(StaticSource::new(values)))?;
            FlagEvaluator::for_app(provider, app)
        }
        None => load_evaluator(config, app)?,
    };

    println!("Running: {}", suite.name.bold());
    println!();

    let mut passed = 0;
    let mut failed = 0;

    for test in &suite.tests {
        let start = Instant::now();
        let actual = match &test.user {
            Some(user) => evaluator.is_feature_enabled_for_user(&test.feature, user),
            None => Ok(evaluator.is_feature_enabled(&test.feature)),
        };
        let duration = start.elapsed();

        match actual {
            Ok(actual) if actual == test.expected => {
                passed += 1;
                println!("{} {} ({:?})", "✓".green(), test.description, duration);
                if verbose {
                    println!("  Feature: {}", test.feature);
                    if let Some(user) = &test.user {
                        println!("  User: {} (bucket {})", user, bucket(user));
                    }
                    println!("  Expected: {}", test.expected);
                    println!();
                }
            }
            Ok(actual) => {
                failed += 1;
                println!("{} {} ({:?})", "✗".red(), test.description, duration);
                println!("  Expected: {}", test.expected.to_string().green());
                println!("  Actual: {}", actual.to_string().red());
                println!();
            }
            Err(e) => {
                failed += 1;
                println!("{} {} ({:?})", "✗".red(), test.description, duration);
                println!("  Error: {}", e.message.red());
                println!();
            }
        }
    }

    println!();
    let summary = format!("Results: {} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", summary.green());
        Ok(())
    } else {
        println!("{}", summary.red());
        Err(format!("{} test(s) failed", failed))
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = cli.config.as_deref();
    let app = cli.app.as_str();
    let pretty = cli.pretty;

    match cli.command {
        Commands::Enabled { feature, user } => {
            let evaluator = load_evaluator(config, app)?;
            run_enabled(&evaluator, &feature, user.as_deref(), pretty)
        }
        Commands::Feature { feature } => {
            let evaluator = load_evaluator(config, app)?;
            let status = evaluator
                .feature_status(&feature)
                .ok_or_else(|| format!("Feature not found: {}", feature))?;
            print_result(&format!("Feature '{}'", feature), &status, pretty);
            Ok(())
        }
        Commands::Features => {
            let evaluator = load_evaluator(config, app)?;
            print_result("Features", &evaluator.features(), pretty);
            Ok(())
        }
        Commands::Limits => {
            let evaluator = load_evaluator(config, app)?;
            print_result("Limits", &evaluator.limits(), pretty);
            Ok(())
        }
        Commands::Cache => {
            let evaluator = load_evaluator(config, app)?;
            print_result("Cache settings", &evaluator.cache_settings(), pretty);
            Ok(())
        }
        Commands::Keys => {
            let evaluator = load_evaluator(config, app)?;
            print_result("Configuration keys", &evaluator.config_keys(), pretty);
            Ok(())
        }
        Commands::Get { key } => {
            let evaluator = load_evaluator(config, app)?;
            let entry = evaluator
                .config_value(&key)
                .ok_or_else(|| EvaluatorError::key_not_found(key.as_str()).message)?;
            print_result("Configuration value", &entry, pretty);
            Ok(())
        }
        Commands::Stats => {
            let evaluator = load_evaluator(config, app)?;
            print_result("Configuration stats", &evaluator.config_stats(), pretty);
            Ok(())
        }
        Commands::Refresh => {
            let evaluator = load_evaluator(config, app)?;
            let response = evaluator.refresh().map_err(|e| e.message)?;
            print_result(&response.message, &response, pretty);
            Ok(())
        }
        Commands::Bucket { user } => {
            if user.trim().is_empty() {
                return Err("User id must not be empty".to_string());
            }
            print_result(
                &format!("Bucket for '{}'", user),
                &json!({"user": user, "bucket": bucket(&user)}),
                pretty,
            );
            Ok(())
        }
        Commands::Rollout { percentage, users } => run_rollout(percentage, users, pretty),
        Commands::Test { test_file } => run_test(&test_file, config, app, cli.verbose),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
