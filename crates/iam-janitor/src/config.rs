//! Run configuration
//!
//! Resolved once at startup from three layers, later layers winning:
//! built-in defaults, an optional JSON file, then CLI flags and `JANITOR_*`
//! environment variables. The result is validated before any AWS call.

use crate::collector::CollectorConfig;
use crate::error::ConfigError;
use crate::executor::ExecutorConfig;
use crate::retry::RetryPolicy;
use crate::sweep::SweepSettings;
use iam_janitor_common::Policy;
use iam_janitor_common::defaults::{
    default_concurrency, default_deadline_secs, default_environment, default_max_attempts,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Janitor configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JanitorConfig {
    /// Credentials idle for longer than this many days are revoked
    #[serde(default)]
    pub max_inactive_days: Option<i64>,

    /// Log at DEBUG instead of INFO
    #[serde(default)]
    pub debug: bool,

    /// Deployment label, included in logs
    #[serde(default = "default_environment")]
    pub environment: String,

    /// AWS region (SDK default chain when unset)
    #[serde(default)]
    pub region: Option<String>,

    /// AWS profile name (overrides default credential resolution)
    #[serde(default)]
    pub aws_profile: Option<String>,

    /// Classify and log, but delete nothing
    #[serde(default)]
    pub dry_run: bool,

    /// Concurrent users during collection and concurrent deletions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per directory read, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Overall run deadline in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Write the sweep report as JSON to this path
    #[serde(default)]
    pub report: Option<PathBuf>,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            max_inactive_days: None,
            debug: false,
            environment: default_environment(),
            region: None,
            aws_profile: None,
            dry_run: false,
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            deadline_secs: default_deadline_secs(),
            report: None,
            log_json: false,
        }
    }
}

/// Values given on the command line or through the environment.
///
/// `None` (or `false` for switches) leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_inactive_days: Option<i64>,
    pub debug: bool,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub aws_profile: Option<String>,
    pub dry_run: bool,
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub deadline_secs: Option<u64>,
    pub report: Option<PathBuf>,
    pub log_json: bool,
}

impl JanitorConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(&display, e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::parse(&display, e))
    }

    /// Defaults, then the optional file, then `overrides`.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(days) = overrides.max_inactive_days {
            self.max_inactive_days = Some(days);
        }
        if let Some(environment) = overrides.environment {
            self.environment = environment;
        }
        if let Some(region) = overrides.region {
            self.region = Some(region);
        }
        if let Some(profile) = overrides.aws_profile {
            self.aws_profile = Some(profile);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(attempts) = overrides.max_attempts {
            self.max_attempts = attempts;
        }
        if let Some(secs) = overrides.deadline_secs {
            self.deadline_secs = secs;
        }
        if let Some(report) = overrides.report {
            self.report = Some(report);
        }
        self.debug |= overrides.debug;
        self.dry_run |= overrides.dry_run;
        self.log_json |= overrides.log_json;
    }

    /// Validate and build the staleness policy
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        let days = self
            .max_inactive_days
            .ok_or(ConfigError::MissingMaxInactiveDays)?;
        Ok(Policy::new(days)?)
    }

    /// Validate every setting and build the sweep settings
    pub fn sweep_settings(&self) -> Result<SweepSettings, ConfigError> {
        let policy = self.policy()?;

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.deadline_secs == 0 {
            return Err(ConfigError::InvalidDeadline);
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::EmptyEnvironment);
        }
        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ConfigError::EmptyRegion);
        }

        Ok(SweepSettings {
            policy,
            collector: CollectorConfig {
                concurrency: self.concurrency,
                retry: RetryPolicy::with_max_attempts(self.max_attempts),
            },
            executor: ExecutorConfig {
                concurrency: self.concurrency,
                dry_run: self.dry_run,
            },
        })
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}
