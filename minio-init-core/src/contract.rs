//! # contract: the two ports the reconciliation engine talks through
//!
//! - [`StorageAdminClient`] abstracts every query and mutation against the
//!   storage cluster. The binary ships an adapter driving the `mc` client; the
//!   in-memory cluster in [`crate::memory`] implements it for tests.
//! - [`Reporter`] receives every line of progress and summary output. Tasks
//!   never print directly.
//!
//! ## Idempotence contract
//! Setters report whether anything actually changed through [`SettingChange`].
//! Re-applying a value that is already in effect must return
//! `Ok(SettingChange::Unchanged)`, never an error.
//!
//! ## Mocking
//! `StorageAdminClient` is annotated for `mockall`; `MockStorageAdminClient` is
//! exported under the `test-export-mocks` feature (on by default).

use async_trait::async_trait;
#[allow(unused_imports)]
use mockall::{automock, predicate::*};
use serde_json::Value;

use crate::error::AdminError;
use crate::resources::{AnonymousAccess, QuotaSpec, Retention};
use crate::summary::RunSummary;
use crate::tasks::{TaskDescriptor, TaskResult};

/// Whether a setter had to modify the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    Changed,
    Unchanged,
}

impl SettingChange {
    pub fn changed(self) -> bool {
        matches!(self, SettingChange::Changed)
    }
}

/// Result of a create-or-update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Parameters for creating a bucket. Object-lock can only be requested here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBucket {
    pub name: String,
    pub region: Option<String>,
    pub object_lock: bool,
}

/// Group membership and policies as reported by the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub members: Vec<String>,
    pub policies: Vec<String>,
}

/// Parameters for creating a service account under a parent user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceAccount {
    pub parent_user: String,
    pub access_key: String,
    pub secret_key: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Administrative access to the storage cluster.
///
/// Calls are issued strictly one after another by the reconciler; implementors
/// do not need to handle concurrent use.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageAdminClient: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, AdminError>;

    /// Creates the bucket, enabling object-lock atomically when requested.
    async fn create_bucket(&self, bucket: &NewBucket) -> Result<(), AdminError>;

    async fn set_versioning(&self, bucket: &str, enabled: bool)
        -> Result<SettingChange, AdminError>;

    /// Applies a quota. Rejects sizes the backing system cannot parse.
    async fn set_quota(&self, bucket: &str, quota: &QuotaSpec)
        -> Result<SettingChange, AdminError>;

    /// Sets the default retention. Fails on buckets without object-lock.
    async fn set_retention(
        &self,
        bucket: &str,
        retention: &Retention,
    ) -> Result<SettingChange, AdminError>;

    async fn set_anonymous_access(
        &self,
        bucket: &str,
        access: AnonymousAccess,
    ) -> Result<SettingChange, AdminError>;

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError>;

    async fn create_policy(&self, name: &str, document: &Value) -> Result<(), AdminError>;

    /// Replaces the content of an existing policy so it matches `document`.
    async fn replace_policy(&self, name: &str, document: &Value)
        -> Result<SettingChange, AdminError>;

    /// Returns `None` when the group does not exist (a group exists only while
    /// it has at least one member).
    async fn group_info(&self, group: &str) -> Result<Option<GroupInfo>, AdminError>;

    /// Adds a user to a group, creating the group if needed.
    async fn group_add_member(&self, group: &str, user: &str)
        -> Result<SettingChange, AdminError>;

    async fn attach_group_policy(
        &self,
        group: &str,
        policy: &str,
    ) -> Result<SettingChange, AdminError>;

    /// Creates the user, or re-asserts the secret of an existing one.
    async fn upsert_user(&self, access_key: &str, secret_key: &str)
        -> Result<UpsertOutcome, AdminError>;

    async fn attach_user_policy(&self, user: &str, policy: &str)
        -> Result<SettingChange, AdminError>;

    /// Fails with [`AdminError::AlreadyExists`] when the access key is taken.
    async fn create_service_account(&self, account: &NewServiceAccount)
        -> Result<(), AdminError>;
}

/// Disposition of a single item (or sub-step of an item) inside a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Created,
    Updated,
    Unchanged,
    /// A sub-setting applied to an item, printed indented below it.
    Detail,
    Warning,
    Failed,
}

/// Severity of a run-level message that does not belong to any task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Receives progress output from the reconciler and its tasks.
pub trait Reporter: Send + Sync {
    fn document_started(&self, label: &str);

    fn task_started(&self, task: &TaskDescriptor);

    fn item(&self, status: ItemStatus, message: &str);

    fn task_finished(&self, task: &TaskDescriptor, result: &TaskResult);

    fn notice(&self, level: NoticeLevel, message: &str);

    fn summary(&self, summary: &RunSummary);
}
