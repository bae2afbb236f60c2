use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    // Bare numbers are seconds, like in scenario files.
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(s)
        .map_err(|e| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m): {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress lines and a final summary line (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "surge",
    author,
    version,
    about = "Minimal HTTP load generator with thresholds",
    long_about = "surge runs a fixed number of virtual users against an HTTP target for a fixed duration, records request/check/iteration metrics and evaluates pass/fail thresholds.\n\nA scenario is a YAML file describing the request, the checks and the thresholds. `${VAR}` placeholders in the request URL expand from the process environment; use `--env KEY=VALUE` to add/override values.",
    after_help = "Examples:\n  surge run smoke.yaml\n  surge run smoke.yaml --vus 50 --duration 30s\n  surge run smoke.yaml --env BASE_URL=http://127.0.0.1:8080 --output json\n\nExit status: 0 thresholds passed, 11 thresholds failed, 30 invalid input, 40 aborted/runtime error."
)]
pub struct Cli {
    /// Log filter for diagnostics on stderr (e.g. warn, debug, surge_core=debug).
    /// Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test scenario
    #[command(
        long_about = "Run a YAML scenario with the configured number of virtual users.\n\nCLI flags override values from the scenario file."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the scenario (.yaml/.yml)
    pub scenario: PathBuf,

    /// Number of virtual users
    #[arg(long)]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Pause between two iterations of the same virtual user
    #[arg(long, value_parser = parse_duration)]
    pub pause: Option<Duration>,

    /// How long virtual users may take to finish once the duration is up
    #[arg(long, value_parser = parse_duration)]
    pub grace_period: Option<Duration>,

    /// Add/override env vars used for `${VAR}` expansion (repeatable, KEY=VALUE).
    /// CLI-provided vars override the current process env.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Run name (prefixed to the start timestamp)
    #[arg(long, env = "SURGE_RUN_NAME")]
    pub name: Option<String>,

    /// Free-form run parameters recorded with the run identity
    #[arg(long, env = "SURGE_RUN_PARAMS")]
    pub params: Option<String>,

    /// How often live progress is reported (0 disables it)
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub progress_interval: Duration,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
