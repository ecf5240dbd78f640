//! Staleness policy

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid policy parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("max_inactive_days must be greater than 0, got {0}")]
    NonPositiveDays(i64),

    #[error("max_inactive_days {0} is too large")]
    DaysOutOfRange(i64),
}

/// Upper bound for the threshold (100 years). Keeps `cutoff` arithmetic in range.
const MAX_DAYS: i64 = 36_500;

/// How long a credential may sit unused before it is revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    max_inactive_days: u32,
}

impl Policy {
    pub fn new(max_inactive_days: i64) -> Result<Self, PolicyError> {
        if max_inactive_days <= 0 {
            return Err(PolicyError::NonPositiveDays(max_inactive_days));
        }
        if max_inactive_days > MAX_DAYS {
            return Err(PolicyError::DaysOutOfRange(max_inactive_days));
        }
        Ok(Self {
            max_inactive_days: max_inactive_days as u32,
        })
    }

    pub fn max_inactive_days(&self) -> u32 {
        self.max_inactive_days
    }

    /// Activity strictly before this instant is stale.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.max_inactive_days))
    }
}
