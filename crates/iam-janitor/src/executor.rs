//! Revocation of stale credentials
//!
//! Each target in a [`RevocationPlan`] is deleted independently. A failure on
//! one item never stops the others. A credential that is already gone counts
//! as revoked, so running the same plan twice is harmless.
//!
//! Deletions are not retried: a failed item is reported and picked up again
//! by the next scheduled run.

use futures::{StreamExt, stream};
use iam_janitor_common::defaults::DEFAULT_CONCURRENCY;
use iam_janitor_common::{
    DirectoryService, RevocationOutcome, RevocationPlan, RevocationResult, RevocationTarget,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deletions in flight at once
    pub concurrency: usize,
    /// Log what would be deleted without calling the directory
    pub dry_run: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

/// Deletes the credentials named by a plan
pub struct RevocationExecutor<'a, D> {
    directory: &'a D,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

/// How a single target ended, plus whether cancellation prevented the attempt
struct ItemReport {
    index: usize,
    target: RevocationTarget,
    outcome: RevocationOutcome,
    cancelled: bool,
}

impl<'a, D: DirectoryService> RevocationExecutor<'a, D> {
    pub fn new(directory: &'a D, config: ExecutorConfig, cancel: CancellationToken) -> Self {
        Self {
            directory,
            config,
            cancel,
        }
    }

    /// Revoke every credential in `plan`.
    ///
    /// Never fails as a whole; per-item failures are collected in the
    /// returned [`RevocationResult`], in plan order.
    #[instrument(skip_all, fields(items = plan.len(), dry_run = self.config.dry_run))]
    pub async fn revoke(&self, plan: &RevocationPlan) -> RevocationResult {
        let targets = RevocationTarget::from_plan(plan);
        let mut result = RevocationResult::default();

        if targets.is_empty() {
            info!("No stale credentials to revoke");
            return result;
        }

        info!(
            login_profiles = plan.login_profiles.len(),
            access_keys = plan.access_keys.len(),
            "Revoking stale credentials"
        );

        let mut reports: Vec<ItemReport> = stream::iter(targets.into_iter().enumerate())
            .map(|(index, target)| async move {
                let (outcome, cancelled) = self.revoke_one(&target).await;
                ItemReport {
                    index,
                    target,
                    outcome,
                    cancelled,
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        reports.sort_by_key(|r| r.index);
        for report in reports {
            result.interrupted |= report.cancelled;
            result.record(report.target, report.outcome);
        }

        if result.interrupted {
            warn!(
                skipped = result.skipped,
                "Run cancelled before every revocation was attempted"
            );
        }

        result
    }

    async fn revoke_one(&self, target: &RevocationTarget) -> (RevocationOutcome, bool) {
        if self.cancel.is_cancelled() {
            debug!(credential = %target, "Run cancelled, not attempting");
            return (RevocationOutcome::Skipped, true);
        }

        if self.config.dry_run {
            info!(credential = %target, "[DRY RUN] Would revoke");
            return (RevocationOutcome::Skipped, false);
        }

        let response = match target {
            RevocationTarget::LoginProfile { principal } => {
                self.directory.delete_login_profile(principal.as_str()).await
            }
            RevocationTarget::AccessKey { owner, key_id } => {
                self.directory
                    .delete_access_key(owner.as_str(), key_id.as_str())
                    .await
            }
        };

        let outcome = match response {
            Ok(()) => {
                info!(credential = %target, kind = target.kind(), "Revoked");
                RevocationOutcome::Deleted
            }
            Err(e) if e.is_not_found() => {
                info!(credential = %target, kind = target.kind(), "Already revoked");
                RevocationOutcome::AlreadyAbsent
            }
            Err(e) => {
                warn!(credential = %target, kind = target.kind(), error = %e, "Failed to revoke");
                RevocationOutcome::Failed(e.to_string())
            }
        };
        (outcome, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_janitor_common::{
        AccessKeyId, DirectoryError, DirectoryOperation, KeyRevocation, PrincipalName,
        ProfileRevocation,
    };
    use iam_janitor_test_utils::{FakeDirectory, FakeKey, FakeUser, day};

    fn profile(name: &str) -> ProfileRevocation {
        ProfileRevocation {
            principal: PrincipalName::new(name),
            arn: format!("arn:aws:iam::123456789012:user/{name}"),
            last_activity: day(0),
            idle_days: 100,
        }
    }

    fn key(owner: &str, id: &str) -> KeyRevocation {
        KeyRevocation {
            owner: PrincipalName::new(owner),
            key_id: AccessKeyId::new(id),
            last_activity: day(0),
            idle_days: 100,
        }
    }

    fn directory() -> FakeDirectory {
        FakeDirectory::new()
            .with_user(
                FakeUser::new("alice")
                    .login_profile(day(0))
                    .key(FakeKey::new("AKIA1", day(0)))
                    .key(FakeKey::new("AKIA2", day(0))),
            )
            .with_user(FakeUser::new("bob").login_profile(day(0)))
    }

    fn plan() -> RevocationPlan {
        RevocationPlan {
            login_profiles: vec![profile("alice"), profile("bob")],
            access_keys: vec![key("alice", "AKIA1"), key("alice", "AKIA2")],
        }
    }

    fn executor(directory: &FakeDirectory, dry_run: bool) -> RevocationExecutor<'_, FakeDirectory> {
        RevocationExecutor::new(
            directory,
            ExecutorConfig {
                concurrency: 2,
                dry_run,
            },
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn revokes_every_target() {
        let directory = directory();

        let result = executor(&directory, false).revoke(&plan()).await;

        assert_eq!(result.attempted, 4);
        assert_eq!(result.deleted, 4);
        assert!(!result.has_failures());
        assert!(!directory.has_login_profile("alice"));
        assert!(!directory.has_login_profile("bob"));
        assert!(directory.key_ids("alice").is_empty());
    }

    #[tokio::test]
    async fn second_run_treats_missing_credentials_as_revoked() {
        let directory = directory();
        let executor = executor(&directory, false);

        executor.revoke(&plan()).await;
        let second = executor.revoke(&plan()).await;

        assert_eq!(second.attempted, 4);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.already_absent, 4);
        assert_eq!(second.succeeded(), 4);
        assert!(!second.has_failures());
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let directory = directory();
        directory.fail_always(
            DirectoryOperation::DeleteAccessKey,
            "AKIA1",
            DirectoryError::AccessDenied("iam:DeleteAccessKey".into()),
        );

        let result = executor(&directory, false).revoke(&plan()).await;

        assert_eq!(result.attempted, 4);
        assert_eq!(result.deleted, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(
            result.failures[0].target,
            RevocationTarget::AccessKey {
                owner: PrincipalName::new("alice"),
                key_id: AccessKeyId::new("AKIA1"),
            }
        );
        assert_eq!(directory.key_ids("alice"), vec!["AKIA1".to_string()]);
    }

    #[tokio::test]
    async fn user_deleted_after_planning_counts_as_revoked() {
        let directory = directory();
        directory.remove_user("bob");

        let result = executor(&directory, false).revoke(&plan()).await;

        assert_eq!(result.deleted, 3);
        assert_eq!(result.already_absent, 1);
        assert!(!result.has_failures());
    }

    #[tokio::test]
    async fn failed_deletions_are_not_retried() {
        let directory = directory();
        directory.fail_next(DirectoryOperation::DeleteLoginProfile, DirectoryError::Throttled);

        let plan = RevocationPlan {
            login_profiles: vec![profile("alice")],
            access_keys: vec![],
        };
        let result = executor(&directory, false).revoke(&plan).await;

        assert_eq!(result.failed, 1);
        assert_eq!(directory.calls(DirectoryOperation::DeleteLoginProfile), 1);
        assert!(directory.has_login_profile("alice"));
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let directory = directory();

        let result = executor(&directory, true).revoke(&plan()).await;

        assert_eq!(result.attempted, 0);
        assert_eq!(result.skipped, 4);
        assert!(!result.interrupted);
        assert_eq!(directory.total_calls(), 0);
        assert!(directory.has_login_profile("alice"));
    }

    #[tokio::test]
    async fn cancelled_run_skips_and_marks_interrupted() {
        let directory = directory();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = RevocationExecutor::new(&directory, ExecutorConfig::default(), cancel)
            .revoke(&plan())
            .await;

        assert!(result.interrupted);
        assert_eq!(result.skipped, 4);
        assert_eq!(result.attempted, 0);
        assert_eq!(directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn empty_plan_makes_no_calls() {
        let directory = directory();

        let result = executor(&directory, false)
            .revoke(&RevocationPlan::default())
            .await;

        assert_eq!(result, RevocationResult::default());
        assert_eq!(directory.total_calls(), 0);
    }
}
