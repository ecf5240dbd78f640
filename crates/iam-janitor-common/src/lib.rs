//! iam-janitor-common - Domain types for the stale credential sweep
//!
//! This crate has no AWS SDK dependency. It holds the pieces of the sweep
//! that can be reasoned about without a network:
//!
//! - [`model`]: principals, login profiles, access keys and the run snapshot
//! - [`policy`]: the staleness threshold
//! - [`classify`]: pure classification of a snapshot into a revocation plan
//! - [`outcome`]: per-item outcomes and the aggregated revocation result
//! - [`directory`]: the directory service port and its error taxonomy
//! - [`defaults`]: default configuration values

pub mod classify;
pub mod defaults;
pub mod directory;
pub mod model;
pub mod outcome;
pub mod policy;

// Re-export commonly used types
pub use classify::{KeyRevocation, ProfileRevocation, RevocationPlan, classify};
pub use directory::{
    AccessKeyRecord, DirectoryError, DirectoryOperation, DirectoryService, LoginProfileRecord,
    Page, PrincipalRecord,
};
pub use model::{
    AccessKey, AccessKeyId, KeyStatus, LoginProfile, Principal, PrincipalName, Snapshot,
};
pub use outcome::{RevocationFailure, RevocationOutcome, RevocationResult, RevocationTarget};
pub use policy::{Policy, PolicyError};
