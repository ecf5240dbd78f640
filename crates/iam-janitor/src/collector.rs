//! Snapshot collection
//!
//! Builds a complete [`Snapshot`] of every user and credential in the account.
//! Listings follow the service's markers until exhausted. Per-user lookups fan
//! out with a bounded number of users in flight.
//!
//! Collection is all-or-nothing: if any call still fails after retries, the
//! whole collection fails and no snapshot is produced.

use crate::error::CollectionError;
use crate::retry::{RetryPolicy, retry_directory_call};
use futures::{StreamExt, TryStreamExt, stream};
use iam_janitor_common::defaults::DEFAULT_CONCURRENCY;
use iam_janitor_common::{
    AccessKey, AccessKeyId, AccessKeyRecord, DirectoryError, DirectoryOperation, DirectoryService,
    LoginProfile, Principal, PrincipalName, PrincipalRecord, Snapshot,
};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Users whose credentials are looked up concurrently
    pub concurrency: usize,
    /// Retry policy for every directory call
    pub retry: RetryPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Collects a [`Snapshot`] from a directory service
pub struct SnapshotCollector<'a, D> {
    directory: &'a D,
    config: CollectorConfig,
    cancel: CancellationToken,
}

impl<'a, D: DirectoryService> SnapshotCollector<'a, D> {
    pub fn new(directory: &'a D, config: CollectorConfig, cancel: CancellationToken) -> Self {
        Self {
            directory,
            config,
            cancel,
        }
    }

    /// Collect the full snapshot, or fail without a partial result.
    #[instrument(skip_all, fields(concurrency = self.config.concurrency))]
    pub async fn collect(&self) -> Result<Snapshot, CollectionError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CollectionError::Cancelled),
            result = self.collect_all() => result,
        }
    }

    async fn collect_all(&self) -> Result<Snapshot, CollectionError> {
        info!("Collecting users");
        let records = self.list_all_principals().await?;

        let principals: Vec<Option<Principal>> = stream::iter(records)
            .map(|record| self.collect_principal(record))
            .buffer_unordered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let snapshot = Snapshot::new(principals.into_iter().flatten().collect());
        info!(
            users = snapshot.len(),
            login_profiles = snapshot.login_profile_count(),
            access_keys = snapshot.access_key_count(),
            "Snapshot collected"
        );
        Ok(snapshot)
    }

    async fn list_all_principals(&self) -> Result<Vec<PrincipalRecord>, CollectionError> {
        let directory = self.directory;
        let mut records = Vec::new();
        let mut marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .call(DirectoryOperation::ListPrincipals, "*", || {
                    directory.list_principals(marker.clone())
                })
                .await?;
            pages += 1;
            records.extend(page.items);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        debug!(pages, count = records.len(), "Listed all users");
        Ok(records)
    }

    /// Returns `None` if the user was deleted while we were looking at it.
    async fn collect_principal(
        &self,
        record: PrincipalRecord,
    ) -> Result<Option<Principal>, CollectionError> {
        let directory = self.directory;
        let name = record.name.as_str();

        let profile = match self
            .call(DirectoryOperation::GetLoginProfile, name, || {
                directory.get_login_profile(name)
            })
            .await
        {
            Ok(profile) => profile,
            Err(e) if is_vanished(&e) => {
                debug!(user = %name, "User disappeared during collection, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let key_records = match self.list_all_access_keys(name).await {
            Ok(keys) => keys,
            Err(e) if is_vanished(&e) => {
                debug!(user = %name, "User disappeared during collection, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let owner = PrincipalName::new(name);
        let mut access_keys = Vec::with_capacity(key_records.len());
        for key in key_records {
            let key_id = key.id.as_str();
            let last_used_at = match self
                .call(DirectoryOperation::GetAccessKeyLastUsed, key_id, || {
                    directory.access_key_last_used(key_id)
                })
                .await
            {
                Ok(last_used) => last_used,
                Err(e) if is_vanished(&e) => {
                    debug!(user = %name, access_key_id = %key_id, "Access key disappeared, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            access_keys.push(build_access_key(&owner, key, last_used_at));
        }

        Ok(Some(Principal {
            name: owner,
            arn: record.arn,
            login_profile: profile.map(|p| LoginProfile {
                created_at: p.created_at,
                last_used_at: record.password_last_used,
            }),
            access_keys,
        }))
    }

    async fn list_all_access_keys(
        &self,
        principal: &str,
    ) -> Result<Vec<AccessKeyRecord>, CollectionError> {
        let directory = self.directory;
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .call(DirectoryOperation::ListAccessKeys, principal, || {
                    directory.list_access_keys(principal, marker.clone())
                })
                .await?;
            keys.extend(page.items);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn call<T, F, Fut>(
        &self,
        operation: DirectoryOperation,
        target: &str,
        call: F,
    ) -> Result<T, CollectionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DirectoryError>>,
    {
        retry_directory_call(&self.config.retry, operation, target, call)
            .await
            .map_err(|e| CollectionError::Directory {
                operation,
                target: target.to_string(),
                attempts: e.attempts,
                source: e.source,
            })
    }
}

fn is_vanished(err: &CollectionError) -> bool {
    err.directory_error().is_some_and(DirectoryError::is_not_found)
}

fn build_access_key(
    owner: &PrincipalName,
    record: AccessKeyRecord,
    last_used_at: Option<chrono::DateTime<chrono::Utc>>,
) -> AccessKey {
    AccessKey {
        id: AccessKeyId::new(record.id),
        owner: owner.clone(),
        status: record.status,
        created_at: record.created_at,
        last_used_at,
    }
}
