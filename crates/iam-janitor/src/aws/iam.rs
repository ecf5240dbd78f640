//! IAM-backed directory service
//!
//! Thin mapping between the IAM API and [`DirectoryService`]. Pagination is
//! driven by the caller; this module returns one page per call together with
//! the marker IAM handed back.

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use aws_sdk_iam::Client;
use aws_sdk_iam::primitives::DateTime as AwsDateTime;
use aws_sdk_iam::types::StatusType;
use chrono::{DateTime, Utc};
use iam_janitor_common::{
    AccessKeyRecord, DirectoryError, DirectoryService, KeyStatus, LoginProfileRecord, Page,
    PrincipalRecord,
};
use tracing::{debug, warn};

/// IAM client for user credential listing and deletion
#[derive(Clone)]
pub struct IamDirectory {
    client: Client,
}

impl FromAwsContext for IamDirectory {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }
}

impl IamDirectory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_chrono(dt: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// IAM only reports a marker while the listing is truncated
fn next_marker(is_truncated: bool, marker: Option<&str>) -> Option<String> {
    if is_truncated {
        marker.map(|m| m.to_string())
    } else {
        None
    }
}

impl DirectoryService for IamDirectory {
    async fn list_principals(
        &self,
        marker: Option<String>,
    ) -> Result<Page<PrincipalRecord>, DirectoryError> {
        let response = self
            .client
            .list_users()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let items = response
            .users()
            .iter()
            .map(|user| PrincipalRecord {
                name: user.user_name().to_string(),
                arn: user.arn().to_string(),
                password_last_used: user.password_last_used().and_then(to_chrono),
            })
            .collect::<Vec<_>>();

        debug!(count = items.len(), truncated = response.is_truncated(), "Listed users");

        Ok(Page {
            items,
            next_marker: next_marker(response.is_truncated(), response.marker()),
        })
    }

    async fn get_login_profile(
        &self,
        principal: &str,
    ) -> Result<Option<LoginProfileRecord>, DirectoryError> {
        let response = match self
            .client
            .get_login_profile()
            .user_name(principal)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = classify_sdk_error(&e);
                // A user without console access has no login profile
                return if err.is_not_found() { Ok(None) } else { Err(err) };
            }
        };

        Ok(response.login_profile().and_then(|profile| {
            to_chrono(profile.create_date()).map(|created_at| LoginProfileRecord { created_at })
        }))
    }

    async fn list_access_keys(
        &self,
        principal: &str,
        marker: Option<String>,
    ) -> Result<Page<AccessKeyRecord>, DirectoryError> {
        let response = self
            .client
            .list_access_keys()
            .user_name(principal)
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let mut items = Vec::new();
        for metadata in response.access_key_metadata() {
            let Some(id) = metadata.access_key_id() else {
                continue;
            };
            let Some(created_at) = metadata.create_date().and_then(to_chrono) else {
                warn!(
                    user = %principal,
                    access_key_id = %id,
                    "Access key has no creation date, skipping"
                );
                continue;
            };
            let status = match metadata.status() {
                Some(StatusType::Inactive) => KeyStatus::Inactive,
                _ => KeyStatus::Active,
            };
            items.push(AccessKeyRecord {
                id: id.to_string(),
                status,
                created_at,
            });
        }

        Ok(Page {
            items,
            next_marker: next_marker(response.is_truncated(), response.marker()),
        })
    }

    async fn access_key_last_used(
        &self,
        key_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DirectoryError> {
        let response = self
            .client
            .get_access_key_last_used()
            .access_key_id(key_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(response
            .access_key_last_used()
            .and_then(|usage| usage.last_used_date())
            .and_then(to_chrono))
    }

    async fn delete_login_profile(&self, principal: &str) -> Result<(), DirectoryError> {
        self.client
            .delete_login_profile()
            .user_name(principal)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        Ok(())
    }

    async fn delete_access_key(&self, principal: &str, key_id: &str) -> Result<(), DirectoryError> {
        // Without an explicit user name IAM would resolve the key against the
        // caller's own user
        self.client
            .delete_access_key()
            .user_name(principal)
            .access_key_id(key_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        Ok(())
    }
}
