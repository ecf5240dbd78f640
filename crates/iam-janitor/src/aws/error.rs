//! AWS error classification
//!
//! Maps IAM SDK errors onto [`DirectoryError`] using the `.code()` from
//! `ProvideErrorMetadata`, not string matching on the Debug format.

use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};
use iam_janitor_common::DirectoryError;

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &["NoSuchEntity", "NoSuchEntityException"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Known AWS error codes for internal service failures
const SERVICE_FAILURE_CODES: &[&str] = &[
    "ServiceFailure",
    "ServiceFailureException",
    "InternalFailure",
    "ServiceUnavailable",
];

/// Known AWS error codes for missing permissions
const ACCESS_DENIED_CODES: &[&str] = &["AccessDenied", "AccessDeniedException"];

/// Classify an AWS error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> DirectoryError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => DirectoryError::NotFound(message),
        Some(c) if THROTTLING_CODES.contains(&c) => DirectoryError::Throttled,
        Some(c) if SERVICE_FAILURE_CODES.contains(&c) => DirectoryError::ServiceFailure(message),
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => DirectoryError::AccessDenied(message),
        _ => DirectoryError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an IAM SDK error.
///
/// Timeouts, dispatch failures and unreadable responses carry no service
/// error code; they are reported as [`DirectoryError::Transport`].
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> DirectoryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            DirectoryError::Transport(error_chain(err))
        }
        _ => {
            let meta = ProvideErrorMetadata::meta(err);
            match meta.code() {
                Some(code) => classify_aws_error(Some(code), meta.message()),
                None => DirectoryError::Sdk {
                    code: None,
                    message: error_chain(err),
                },
            }
        }
    }
}

/// Render an error and its sources on one line
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
