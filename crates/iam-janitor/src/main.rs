//! iam-janitor: revoke IAM login profiles and access keys that have gone unused
//!
//! Meant to be run on a schedule. Each invocation performs one sweep and exits.

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Parser;
use iam_janitor::aws::{AwsContext, FromAwsContext, IamDirectory, get_current_account_id};
use iam_janitor::{ConfigOverrides, JanitorConfig, run_sweep, shutdown};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Crates whose output is capped at WARN
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_sdk_iam",
    "aws_sdk_sts",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "hyper",
];

#[derive(Parser, Debug)]
#[command(name = "iam-janitor")]
#[command(about = "Revoke IAM login profiles and access keys that have gone unused")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "JANITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Revoke credentials idle for longer than this many days
    #[arg(long, env = "JANITOR_MAX_INACTIVE_DAYS", allow_hyphen_values = true)]
    max_inactive_days: Option<i64>,

    /// Enable debug logging
    #[arg(long, env = "JANITOR_DEBUG")]
    debug: bool,

    /// Deployment label included in logs (default: dev)
    #[arg(long, env = "JANITOR_ENVIRONMENT")]
    environment: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Log what would be revoked without deleting anything
    #[arg(long, env = "JANITOR_DRY_RUN")]
    dry_run: bool,

    /// Concurrent users during collection and concurrent deletions (default: 4)
    #[arg(long, env = "JANITOR_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Attempts per directory read, first try included (default: 5)
    #[arg(long, env = "JANITOR_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Overall deadline in seconds (default: 840)
    #[arg(long, env = "JANITOR_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Write the sweep report as JSON to this file
    #[arg(long, env = "JANITOR_REPORT")]
    report: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JANITOR_LOG_JSON")]
    log_json: bool,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            max_inactive_days: args.max_inactive_days,
            debug: args.debug,
            environment: args.environment,
            region: args.region,
            aws_profile: args.aws_profile,
            dry_run: args.dry_run,
            concurrency: args.concurrency,
            max_attempts: args.max_attempts,
            deadline_secs: args.deadline_secs,
            report: args.report,
            log_json: args.log_json,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

fn init_tracing(config: &JanitorConfig) -> Result<()> {
    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for target in QUIET_TARGETS {
        filter = filter.add_directive(format!("{target}=warn").parse()?);
    }

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();
    let config = JanitorConfig::resolve(config_path.as_deref(), args.into())?;

    init_tracing(&config)?;

    let settings = config.sweep_settings().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    // Single clock reading for the whole run
    let now = Utc::now();

    info!(
        environment = %config.environment,
        max_inactive_days = settings.policy.max_inactive_days(),
        dry_run = config.dry_run,
        concurrency = config.concurrency,
        deadline_secs = config.deadline_secs,
        "Starting iam-janitor"
    );

    if let Some(profile) = &config.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    let aws = AwsContext::load(config.region.as_deref(), config.aws_profile.as_deref()).await;
    get_current_account_id(&aws).await?;
    let directory = IamDirectory::from_context(&aws);

    let cancel = CancellationToken::new();
    shutdown::install(cancel.clone(), config.deadline());

    let report = run_sweep(&directory, &settings, now, &cancel).await;
    // Stop the watcher task
    cancel.cancel();
    let report = report?;

    if let Some(path) = &config.report {
        report.write_json(path)?;
    }

    if report.result.interrupted {
        bail!(
            "Run interrupted before all revocations were attempted ({} skipped)",
            report.result.skipped
        );
    }

    Ok(())
}
