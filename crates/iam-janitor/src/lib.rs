//! iam-janitor - Scheduled revocation of stale IAM credentials
//!
//! Collects every user with its console login profile and access keys,
//! flags the credentials idle for longer than the configured threshold and
//! deletes them.

pub mod aws;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod retry;
pub mod shutdown;
pub mod sweep;

pub use collector::{CollectorConfig, SnapshotCollector};
pub use config::{ConfigOverrides, JanitorConfig};
pub use error::{CollectionError, ConfigError};
pub use executor::{ExecutorConfig, RevocationExecutor};
pub use retry::RetryPolicy;
pub use sweep::{SweepReport, SweepSettings, run_sweep};
