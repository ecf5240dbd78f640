//! End-to-end sweep against the in-memory directory
//!
//! Exercises collection, classification and revocation together, without AWS.

use iam_janitor::{
    CollectionError, CollectorConfig, ExecutorConfig, RetryPolicy, SweepSettings, run_sweep,
};
use iam_janitor_common::{DirectoryError, DirectoryOperation, Policy};
use iam_janitor_test_utils::{FakeDirectory, FakeKey, FakeUser, day};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn settings(max_inactive_days: i64, dry_run: bool) -> SweepSettings {
    SweepSettings {
        policy: Policy::new(max_inactive_days).unwrap(),
        collector: CollectorConfig {
            concurrency: 3,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                jitter: false,
            },
        },
        executor: ExecutorConfig {
            concurrency: 3,
            dry_run,
        },
    }
}

/// Threshold 90 days, now = day 1000 (cutoff day 910)
fn reference_directory() -> FakeDirectory {
    FakeDirectory::new()
        .with_user(
            FakeUser::new("a")
                .login_profile(day(100))
                .password_last_used(day(900)),
        )
        .with_user(
            FakeUser::new("b")
                .login_profile(day(100))
                .password_last_used(day(950)),
        )
        .with_user(
            FakeUser::new("svc")
                .key(FakeKey::new("K1", day(500)).last_used(day(920)))
                .key(FakeKey::new("K2", day(500))),
        )
}

#[tokio::test]
async fn reference_scenario_revokes_only_stale_credentials() {
    let directory = reference_directory();

    let report = run_sweep(
        &directory,
        &settings(90, false),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let profiles: Vec<_> = report
        .plan
        .login_profiles
        .iter()
        .map(|p| p.principal.as_str())
        .collect();
    assert_eq!(profiles, vec!["a"]);
    assert_eq!(report.plan.login_profiles[0].idle_days, 100);

    let keys: Vec<_> = report
        .plan
        .access_keys
        .iter()
        .map(|k| k.key_id.as_str())
        .collect();
    assert_eq!(keys, vec!["K2"]);

    assert_eq!(report.result.deleted, 2);
    assert!(!directory.has_login_profile("a"));
    assert!(directory.has_login_profile("b"));
    assert_eq!(directory.key_ids("svc"), vec!["K1".to_string()]);
}

#[tokio::test]
async fn console_password_never_used_is_kept() {
    let directory =
        FakeDirectory::new().with_user(FakeUser::new("new-hire").login_profile(day(0)));

    let report = run_sweep(
        &directory,
        &settings(90, false),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.plan.login_profiles.is_empty());
    assert_eq!(directory.calls(DirectoryOperation::DeleteLoginProfile), 0);
    assert!(directory.has_login_profile("new-hire"));
}

#[tokio::test]
async fn repeated_sweep_is_a_no_op() {
    let directory = reference_directory();
    let settings = settings(90, false);

    run_sweep(&directory, &settings, day(1000), &CancellationToken::new())
        .await
        .unwrap();
    let second = run_sweep(&directory, &settings, day(1000), &CancellationToken::new())
        .await
        .unwrap();

    assert!(second.plan.is_empty());
    assert_eq!(second.result.attempted, 0);
}

#[tokio::test]
async fn every_page_of_users_is_swept() {
    let directory = FakeDirectory::new().with_page_size(2);
    for name in ["u1", "u2", "u3", "u4", "u5", "u6"] {
        directory.insert_user(
            FakeUser::new(name)
                .login_profile(day(0))
                .password_last_used(day(10)),
        );
    }

    let report = run_sweep(
        &directory,
        &settings(90, false),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(directory.calls(DirectoryOperation::ListPrincipals), 3);
    assert_eq!(report.principals_scanned, 6);
    assert_eq!(report.result.deleted, 6);
    assert!(!directory.has_login_profile("u6"));
}

#[tokio::test]
async fn dry_run_reports_plan_without_deleting() {
    let directory = reference_directory();

    let report = run_sweep(
        &directory,
        &settings(90, true),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.plan.len(), 2);
    assert_eq!(report.result.skipped, 2);
    assert_eq!(directory.calls(DirectoryOperation::DeleteLoginProfile), 0);
    assert_eq!(directory.calls(DirectoryOperation::DeleteAccessKey), 0);
    assert!(directory.has_login_profile("a"));
}

#[tokio::test]
async fn item_failure_leaves_run_successful() {
    let directory = reference_directory();
    directory.fail_always(
        DirectoryOperation::DeleteAccessKey,
        "K2",
        DirectoryError::ServiceFailure("internal".into()),
    );

    let report = run_sweep(
        &directory,
        &settings(90, false),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.result.deleted, 1);
    assert_eq!(report.result.failed, 1);
    assert!(!report.result.interrupted);
    assert!(report.result.failures[0].error.contains("internal"));
}

#[tokio::test]
async fn exhausted_collection_retries_delete_nothing() {
    let directory = reference_directory();
    directory.fail_always(
        DirectoryOperation::GetAccessKeyLastUsed,
        "K1",
        DirectoryError::Transport("connection reset".into()),
    );

    let err = run_sweep(
        &directory,
        &settings(90, false),
        day(1000),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CollectionError::Directory {
            operation: DirectoryOperation::GetAccessKeyLastUsed,
            attempts: 3,
            ..
        }
    ));
    assert_eq!(directory.calls(DirectoryOperation::DeleteLoginProfile), 0);
    assert_eq!(directory.calls(DirectoryOperation::DeleteAccessKey), 0);
}

#[tokio::test]
async fn cancelled_run_fails_collection() {
    let directory = reference_directory();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_sweep(&directory, &settings(90, false), day(1000), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectionError::Cancelled));
    assert!(directory.has_login_profile("a"));
}
