//! AWS account validation and identity

use crate::aws::context::AwsContext;
use anyhow::{Context, Result};
use tracing::info;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fetch the current AWS account ID via STS GetCallerIdentity.
///
/// Requires no permissions beyond valid credentials, so it is used at
/// startup to fail fast before any IAM call is made.
pub async fn get_current_account_id(ctx: &AwsContext) -> Result<AccountId> {
    let identity = ctx
        .sts_client()
        .get_caller_identity()
        .send()
        .await
        .context("Failed to get AWS caller identity - check credentials")?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;

    info!(
        account_id = %account,
        caller_arn = identity.arn().unwrap_or("unknown"),
        "AWS account validated"
    );

    Ok(AccountId(account.to_string()))
}
