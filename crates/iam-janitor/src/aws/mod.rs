//! AWS client modules
//!
//! - IAM: user listing, credential metadata and credential deletion
//! - STS: account ID lookup
//! - error: SDK error classification into the directory error taxonomy

pub mod account;
pub mod context;
pub mod error;
pub mod iam;

pub use account::{AccountId, get_current_account_id};
pub use context::{AwsContext, FromAwsContext};
pub use error::{classify_aws_error, classify_sdk_error};
pub use iam::IamDirectory;
