//! Revocation outcomes and the aggregated result of a sweep

use crate::classify::RevocationPlan;
use crate::model::{AccessKeyId, PrincipalName};
use serde::Serialize;
use std::fmt;

/// A single credential to delete
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevocationTarget {
    LoginProfile {
        principal: PrincipalName,
    },
    AccessKey {
        owner: PrincipalName,
        key_id: AccessKeyId,
    },
}

impl RevocationTarget {
    /// Flatten a plan into targets: login profiles first, then access keys.
    pub fn from_plan(plan: &RevocationPlan) -> Vec<RevocationTarget> {
        let profiles = plan
            .login_profiles
            .iter()
            .map(|p| RevocationTarget::LoginProfile {
                principal: p.principal.clone(),
            });
        let keys = plan.access_keys.iter().map(|k| RevocationTarget::AccessKey {
            owner: k.owner.clone(),
            key_id: k.key_id.clone(),
        });
        profiles.chain(keys).collect()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RevocationTarget::LoginProfile { .. } => "login_profile",
            RevocationTarget::AccessKey { .. } => "access_key",
        }
    }
}

impl fmt::Display for RevocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationTarget::LoginProfile { principal } => {
                write!(f, "login profile of {principal}")
            }
            RevocationTarget::AccessKey { owner, key_id } => {
                write!(f, "access key {key_id} of {owner}")
            }
        }
    }
}

/// Result of a single deletion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// Credential was deleted
    Deleted,
    /// Credential was already gone (not found)
    AlreadyAbsent,
    /// Deletion failed
    Failed(String),
    /// Not attempted (dry run or run interrupted)
    Skipped,
}

/// A deletion that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationFailure {
    pub target: RevocationTarget,
    pub error: String,
}

/// Aggregate of all deletion attempts in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevocationResult {
    /// Deletion calls made
    pub attempted: usize,
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when the run was cancelled before every item was attempted
    pub interrupted: bool,
    pub failures: Vec<RevocationFailure>,
}

impl RevocationResult {
    /// Fold one outcome into the totals
    pub fn record(&mut self, target: RevocationTarget, outcome: RevocationOutcome) {
        match outcome {
            RevocationOutcome::Deleted => {
                self.attempted += 1;
                self.deleted += 1;
            }
            RevocationOutcome::AlreadyAbsent => {
                self.attempted += 1;
                self.already_absent += 1;
            }
            RevocationOutcome::Failed(error) => {
                self.attempted += 1;
                self.failed += 1;
                self.failures.push(RevocationFailure { target, error });
            }
            RevocationOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Deleted or already absent
    pub fn succeeded(&self) -> usize {
        self.deleted + self.already_absent
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{KeyRevocation, ProfileRevocation};
    use chrono::Utc;

    fn profile_target(name: &str) -> RevocationTarget {
        RevocationTarget::LoginProfile {
            principal: PrincipalName::new(name),
        }
    }

    #[test]
    fn plan_flattens_profiles_before_keys() {
        let now = Utc::now();
        let plan = RevocationPlan {
            login_profiles: vec![ProfileRevocation {
                principal: PrincipalName::new("alice"),
                arn: "arn:alice".into(),
                last_activity: now,
                idle_days: 100,
            }],
            access_keys: vec![KeyRevocation {
                owner: PrincipalName::new("bob"),
                key_id: AccessKeyId::new("AKIA1"),
                last_activity: now,
                idle_days: 200,
            }],
        };

        let targets = RevocationTarget::from_plan(&plan);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].kind(), "login_profile");
        assert_eq!(targets[1].to_string(), "access key AKIA1 of bob");
    }

    #[test]
    fn record_tallies_each_outcome() {
        let mut result = RevocationResult::default();
        result.record(profile_target("a"), RevocationOutcome::Deleted);
        result.record(profile_target("b"), RevocationOutcome::AlreadyAbsent);
        result.record(profile_target("c"), RevocationOutcome::Failed("denied".into()));
        result.record(profile_target("d"), RevocationOutcome::Skipped);

        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert!(result.has_failures());
        assert_eq!(result.failures[0].target, profile_target("c"));
        assert_eq!(result.failures[0].error, "denied");
    }

    #[test]
    fn target_serializes_with_kind_tag() {
        let json = serde_json::to_value(profile_target("alice")).unwrap();
        assert_eq!(json["kind"], "login_profile");
        assert_eq!(json["principal"], "alice");
    }
}
