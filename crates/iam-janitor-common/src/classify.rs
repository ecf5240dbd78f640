//! Staleness classification
//!
//! [`classify`] is a pure function of the snapshot, the policy and a single
//! `now` captured by the caller. It never performs I/O and never reads the
//! clock.

use crate::model::{AccessKeyId, PrincipalName, Snapshot};
use crate::policy::Policy;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Login profile flagged for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRevocation {
    pub principal: PrincipalName,
    pub arn: String,
    pub last_activity: DateTime<Utc>,
    pub idle_days: i64,
}

/// Access key flagged for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRevocation {
    pub owner: PrincipalName,
    pub key_id: AccessKeyId,
    pub last_activity: DateTime<Utc>,
    pub idle_days: i64,
}

/// Credentials to revoke, in snapshot order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevocationPlan {
    pub login_profiles: Vec<ProfileRevocation>,
    pub access_keys: Vec<KeyRevocation>,
}

impl RevocationPlan {
    pub fn is_empty(&self) -> bool {
        self.login_profiles.is_empty() && self.access_keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.login_profiles.len() + self.access_keys.len()
    }
}

/// Decide which credentials are stale.
///
/// A credential is stale when its last activity is strictly before
/// `policy.cutoff(now)`. For access keys that is the last use, or creation
/// when the key was never used. A login profile is judged only by its last
/// sign-in: one that was never used to sign in is kept.
pub fn classify(snapshot: &Snapshot, policy: &Policy, now: DateTime<Utc>) -> RevocationPlan {
    let cutoff = policy.cutoff(now);
    let mut plan = RevocationPlan::default();

    for principal in snapshot.principals() {
        let stale_sign_in = principal
            .login_profile
            .as_ref()
            .and_then(|profile| profile.last_used_at)
            .filter(|last_used| *last_used < cutoff);
        if let Some(last_activity) = stale_sign_in {
            plan.login_profiles.push(ProfileRevocation {
                principal: principal.name.clone(),
                arn: principal.arn.clone(),
                last_activity,
                idle_days: (now - last_activity).num_days(),
            });
        }

        for key in &principal.access_keys {
            let last_activity = key.last_activity();
            if last_activity < cutoff {
                plan.access_keys.push(KeyRevocation {
                    owner: key.owner.clone(),
                    key_id: key.id.clone(),
                    last_activity,
                    idle_days: (now - last_activity).num_days(),
                });
            }
        }
    }

    plan
}
