//! Directory service port
//!
//! The collector and executor only talk to the identity directory through
//! [`DirectoryService`]. The AWS IAM implementation lives in the `iam-janitor`
//! crate; tests use the in-memory fake from `iam-janitor-test-utils`.

use crate::model::KeyStatus;
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Directory calls, used for error context and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOperation {
    ListPrincipals,
    GetLoginProfile,
    ListAccessKeys,
    GetAccessKeyLastUsed,
    DeleteLoginProfile,
    DeleteAccessKey,
}

impl DirectoryOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectoryOperation::ListPrincipals => "ListUsers",
            DirectoryOperation::GetLoginProfile => "GetLoginProfile",
            DirectoryOperation::ListAccessKeys => "ListAccessKeys",
            DirectoryOperation::GetAccessKeyLastUsed => "GetAccessKeyLastUsed",
            DirectoryOperation::DeleteLoginProfile => "DeleteLoginProfile",
            DirectoryOperation::DeleteAccessKey => "DeleteAccessKey",
        }
    }
}

impl fmt::Display for DirectoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified directory failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Entity does not exist (treated as success when deleting)
    #[error("not found: {0}")]
    NotFound(String),

    /// Request rate exceeded (retryable)
    #[error("rate limit exceeded")]
    Throttled,

    /// Internal failure on the service side (retryable)
    #[error("service failure: {0}")]
    ServiceFailure(String),

    /// Timeout or connection failure before a response arrived (retryable)
    #[error("transport error: {0}")]
    Transport(String),

    /// Caller lacks permission for the operation
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Any other service error
    #[error("directory error{}: {message}", format_code(.code))]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

fn format_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default()
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DirectoryError::Throttled
                | DirectoryError::ServiceFailure(_)
                | DirectoryError::Transport(_)
        )
    }
}

/// One page of a listing plus the marker for the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` once the listing is exhausted
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }
}

/// Principal as returned by the principal listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    pub name: String,
    pub arn: String,
    /// Last console sign-in, if any
    pub password_last_used: Option<DateTime<Utc>>,
}

/// Login profile metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginProfileRecord {
    pub created_at: DateTime<Utc>,
}

/// Access key as returned by the key listing (no usage data)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeyRecord {
    pub id: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
}

/// Operations the sweep needs from the identity directory.
///
/// Listings are paginated by the service: callers pass back `next_marker`
/// until it is `None`. Lookups return `Ok(None)` when the credential does not
/// exist. Deletions return [`DirectoryError::NotFound`] when the credential is
/// already gone.
pub trait DirectoryService: Send + Sync {
    fn list_principals(
        &self,
        marker: Option<String>,
    ) -> impl Future<Output = Result<Page<PrincipalRecord>, DirectoryError>> + Send;

    fn get_login_profile(
        &self,
        principal: &str,
    ) -> impl Future<Output = Result<Option<LoginProfileRecord>, DirectoryError>> + Send;

    fn list_access_keys(
        &self,
        principal: &str,
        marker: Option<String>,
    ) -> impl Future<Output = Result<Page<AccessKeyRecord>, DirectoryError>> + Send;

    fn access_key_last_used(
        &self,
        key_id: &str,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, DirectoryError>> + Send;

    fn delete_login_profile(
        &self,
        principal: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    fn delete_access_key(
        &self,
        principal: &str,
        key_id: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(DirectoryError::Throttled.is_retryable());
        assert!(DirectoryError::ServiceFailure("boom".into()).is_retryable());
        assert!(DirectoryError::Transport("timeout".into()).is_retryable());
        assert!(!DirectoryError::AccessDenied("nope".into()).is_retryable());
        assert!(!DirectoryError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn not_found_variant() {
        assert!(DirectoryError::NotFound("alice".into()).is_not_found());
        assert!(!DirectoryError::Throttled.is_not_found());
    }

    #[test]
    fn sdk_error_display_includes_code() {
        let err = DirectoryError::Sdk {
            code: Some("LimitExceeded".into()),
            message: "too many".into(),
        };
        assert_eq!(err.to_string(), "directory error [LimitExceeded]: too many");

        let bare = DirectoryError::Sdk {
            code: None,
            message: "odd".into(),
        };
        assert_eq!(bare.to_string(), "directory error: odd");
    }

    #[test]
    fn operation_names_match_api() {
        assert_eq!(DirectoryOperation::ListPrincipals.to_string(), "ListUsers");
        assert_eq!(
            DirectoryOperation::DeleteAccessKey.as_str(),
            "DeleteAccessKey"
        );
    }
}
