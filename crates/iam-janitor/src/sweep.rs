//! One sweep: collect, classify, revoke
//!
//! `now` is captured once by the caller and used for the whole run.

use crate::collector::{CollectorConfig, SnapshotCollector};
use crate::error::CollectionError;
use crate::executor::{ExecutorConfig, RevocationExecutor};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use iam_janitor_common::{DirectoryService, Policy, RevocationPlan, RevocationResult, classify};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a sweep needs besides the directory and the clock
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub policy: Policy,
    pub collector: CollectorConfig,
    pub executor: ExecutorConfig,
}

/// Outcome of a completed sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub now: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub max_inactive_days: u32,
    pub dry_run: bool,
    pub principals_scanned: usize,
    pub login_profiles_scanned: usize,
    pub access_keys_scanned: usize,
    pub plan: RevocationPlan,
    pub result: RevocationResult,
}

impl SweepReport {
    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote sweep report");
        Ok(())
    }

    fn log_summary(&self) {
        let result = &self.result;
        for failure in &result.failures {
            warn!(credential = %failure.target, error = %failure.error, "Revocation failed");
        }
        info!(
            principals = self.principals_scanned,
            flagged_login_profiles = self.plan.login_profiles.len(),
            flagged_access_keys = self.plan.access_keys.len(),
            deleted = result.deleted,
            already_absent = result.already_absent,
            failed = result.failed,
            skipped = result.skipped,
            interrupted = result.interrupted,
            dry_run = self.dry_run,
            "Sweep complete"
        );
    }
}

/// Run a full sweep against `directory`.
///
/// Fails only if the snapshot cannot be collected. Individual revocation
/// failures are reported in [`SweepReport::result`].
pub async fn run_sweep<D: DirectoryService>(
    directory: &D,
    settings: &SweepSettings,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<SweepReport, CollectionError> {
    let cutoff = settings.policy.cutoff(now);
    info!(
        max_inactive_days = settings.policy.max_inactive_days(),
        cutoff = %cutoff,
        dry_run = settings.executor.dry_run,
        "Starting sweep"
    );

    let snapshot =
        SnapshotCollector::new(directory, settings.collector.clone(), cancel.clone())
            .collect()
            .await?;

    let plan = classify(&snapshot, &settings.policy, now);
    for profile in &plan.login_profiles {
        info!(
            principal = %profile.principal,
            arn = %profile.arn,
            idle_days = profile.idle_days,
            "Login profile is stale"
        );
    }
    for key in &plan.access_keys {
        info!(
            owner = %key.owner,
            access_key_id = %key.key_id,
            idle_days = key.idle_days,
            "Access key is stale"
        );
    }

    let result = RevocationExecutor::new(directory, settings.executor.clone(), cancel.clone())
        .revoke(&plan)
        .await;

    let report = SweepReport {
        now,
        cutoff,
        max_inactive_days: settings.policy.max_inactive_days(),
        dry_run: settings.executor.dry_run,
        principals_scanned: snapshot.len(),
        login_profiles_scanned: snapshot.login_profile_count(),
        access_keys_scanned: snapshot.access_key_count(),
        plan,
        result,
    };
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use iam_janitor_common::{DirectoryError, DirectoryOperation};
    use iam_janitor_test_utils::{FakeDirectory, FakeKey, FakeUser, day};
    use std::time::Duration;

    fn settings(days: i64, dry_run: bool) -> SweepSettings {
        SweepSettings {
            policy: Policy::new(days).unwrap(),
            collector: CollectorConfig {
                concurrency: 2,
                retry: RetryPolicy {
                    max_attempts: 2,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(1),
                    jitter: false,
                },
            },
            executor: ExecutorConfig {
                concurrency: 2,
                dry_run,
            },
        }
    }

    #[tokio::test]
    async fn report_counts_snapshot_and_outcomes() {
        let directory = FakeDirectory::new()
            .with_user(
                FakeUser::new("alice")
                    .login_profile(day(0))
                    .password_last_used(day(400))
                    .key(FakeKey::new("AKIA1", day(0))),
            )
            .with_user(
                FakeUser::new("bob")
                    .login_profile(day(0))
                    .password_last_used(day(990)),
            )
            .with_user(FakeUser::new("carol").login_profile(day(0)));

        let report = run_sweep(
            &directory,
            &settings(90, false),
            day(1000),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.cutoff, day(910));
        assert_eq!(report.principals_scanned, 3);
        assert_eq!(report.login_profiles_scanned, 3);
        assert_eq!(report.access_keys_scanned, 1);
        assert_eq!(report.plan.len(), 2);
        assert_eq!(report.result.deleted, 2);
        assert!(!directory.has_login_profile("alice"));
        assert!(directory.has_login_profile("bob"));
        // Password never used to sign in
        assert!(directory.has_login_profile("carol"));
    }

    #[tokio::test]
    async fn collection_failure_revokes_nothing() {
        let directory = FakeDirectory::new()
            .with_user(FakeUser::new("alice").login_profile(day(0)));
        directory.fail_always(
            DirectoryOperation::ListPrincipals,
            "",
            DirectoryError::Throttled,
        );

        let err = run_sweep(
            &directory,
            &settings(90, false),
            day(1000),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CollectionError::Directory { attempts: 2, .. }));
        assert_eq!(directory.calls(DirectoryOperation::DeleteLoginProfile), 0);
        assert!(directory.has_login_profile("alice"));
    }

    #[tokio::test]
    async fn writes_json_report() {
        let directory = FakeDirectory::new().with_user(
            FakeUser::new("alice")
                .login_profile(day(0))
                .password_last_used(day(10)),
        );
        let report = run_sweep(
            &directory,
            &settings(90, true),
            day(1000),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["max_inactive_days"], 90);
        assert_eq!(value["plan"]["login_profiles"][0]["principal"], "alice");
        assert_eq!(value["result"]["skipped"], 1);
    }
}
