//! Default configuration values
//!
//! Shared by the config loader and the CLI so both report the same defaults.

/// Environment label used in logs when none is configured
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Principals looked up concurrently during collection, and deletions in flight
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Attempts per directory call during collection (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Overall run deadline in seconds. Stays under the common 15 minute
/// scheduled-task limit so the run can stop on its own.
pub const DEFAULT_DEADLINE_SECS: u64 = 840;

/// Upper bound on a single AWS API call, in seconds. Keeps a hung request
/// from outliving the run deadline.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// First backoff delay between retries, in milliseconds
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 200;

/// Cap on backoff delay between retries, in milliseconds
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

// Serde default functions for struct field defaults

pub fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

pub fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

pub fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

pub fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}
