//! Principals, credentials and the per-run snapshot
//!
//! Everything here is plain data. A [`Snapshot`] is built once by the collector,
//! handed to the classifier and then dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of a principal (IAM user name). Used to address directory calls.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::Deref,
)]
#[serde(transparent)]
pub struct PrincipalName(String);

impl PrincipalName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access key identifier (e.g. `AKIA...`)
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::Deref,
)]
#[serde(transparent)]
pub struct AccessKeyId(String);

impl AccessKeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access key status as reported by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
        }
    }
}

/// Console login credential attached to a principal
///
/// Only a recorded sign-in can make a profile stale. `created_at` is kept for
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginProfile {
    pub created_at: DateTime<Utc>,
    /// `None` if the password was never used to sign in
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Programmatic credential attached to a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub id: AccessKeyId,
    /// Owning principal
    pub owner: PrincipalName,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    /// `None` if the key was never used
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AccessKey {
    /// Last use, or key creation if the key was never used.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_used_at.unwrap_or(self.created_at)
    }
}

/// A directory identity with all credentials needed to judge staleness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: PrincipalName,
    pub arn: String,
    pub login_profile: Option<LoginProfile>,
    pub access_keys: Vec<AccessKey>,
}

impl Principal {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: PrincipalName::new(name),
            arn: arn.into(),
            login_profile: None,
            access_keys: Vec::new(),
        }
    }

    pub fn with_login_profile(mut self, profile: LoginProfile) -> Self {
        self.login_profile = Some(profile);
        self
    }

    pub fn with_access_key(mut self, key: AccessKey) -> Self {
        self.access_keys.push(key);
        self
    }
}

/// Point-in-time view of every principal in the account
///
/// Principals are kept sorted by name so that classification output does not
/// depend on the order in which lookups completed.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    principals: Vec<Principal>,
}

impl Snapshot {
    pub fn new(mut principals: Vec<Principal>) -> Self {
        principals.sort_by(|a, b| a.name.cmp(&b.name));
        Self { principals }
    }

    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn access_key_count(&self) -> usize {
        self.principals.iter().map(|p| p.access_keys.len()).sum()
    }

    pub fn login_profile_count(&self) -> usize {
        self.principals
            .iter()
            .filter(|p| p.login_profile.is_some())
            .count()
    }
}
