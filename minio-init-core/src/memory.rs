//! In-memory stand-in for a MinIO cluster.
//!
//! Emulates the backing-system rules the engine relies on:
//! - a group exists only while it has at least one member
//! - adding a member to an unknown group creates it
//! - default retention can only be set on object-locked buckets
//! - quota sizes must parse
//! - attaching a policy that does not exist fails
//! - service account access keys are unique
//!
//! Every call is recorded by name so tests can assert what was (not) called.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{
    GroupInfo, NewBucket, NewServiceAccount, SettingChange, StorageAdminClient, UpsertOutcome,
};
use crate::error::AdminError;
use crate::resources::{parse_size, AnonymousAccess, QuotaSpec, Retention};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketState {
    pub region: Option<String>,
    pub object_lock: bool,
    pub versioning: Option<bool>,
    pub quota_bytes: Option<u64>,
    pub retention: Option<Retention>,
    pub anonymous: AnonymousAccess,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupState {
    pub members: BTreeSet<String>,
    pub policies: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    pub secret_key: String,
    pub policies: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    pub buckets: BTreeMap<String, BucketState>,
    pub policies: BTreeMap<String, Value>,
    pub groups: BTreeMap<String, GroupState>,
    pub users: BTreeMap<String, UserState>,
    pub service_accounts: BTreeMap<String, NewServiceAccount>,
}

#[derive(Debug, Default)]
pub struct InMemoryCluster {
    state: Mutex<ClusterState>,
    calls: Mutex<Vec<&'static str>>,
}

fn changed_if(changed: bool) -> SettingChange {
    if changed {
        SettingChange::Changed
    } else {
        SettingChange::Unchanged
    }
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a pre-populated state.
    pub fn with_state(state: ClusterState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::default(),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ClusterState {
        self.lock().clone()
    }

    /// Names of every client method called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut BucketState) -> Result<T, AdminError>,
    ) -> Result<T, AdminError> {
        let mut state = self.lock();
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| AdminError::NotFound(format!("bucket '{bucket}' does not exist")))?;
        f(entry)
    }
}

#[async_trait]
impl StorageAdminClient for InMemoryCluster {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, AdminError> {
        self.record("bucket_exists");
        Ok(self.lock().buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &NewBucket) -> Result<(), AdminError> {
        self.record("create_bucket");
        let mut state = self.lock();
        if state.buckets.contains_key(&bucket.name) {
            return Err(AdminError::AlreadyExists(format!("bucket '{}'", bucket.name)));
        }
        state.buckets.insert(
            bucket.name.clone(),
            BucketState {
                region: bucket.region.clone(),
                object_lock: bucket.object_lock,
                versioning: bucket.object_lock.then_some(true),
                ..BucketState::default()
            },
        );
        Ok(())
    }

    async fn set_versioning(
        &self,
        bucket: &str,
        enabled: bool,
    ) -> Result<SettingChange, AdminError> {
        self.record("set_versioning");
        self.with_bucket(bucket, |b| {
            if b.object_lock && !enabled {
                return Err(AdminError::Rejected(
                    "versioning cannot be suspended on an object-locked bucket".to_string(),
                ));
            }
            let current = b.versioning.unwrap_or(false);
            // Never-versioned buckets are already "not enabled".
            if current == enabled {
                return Ok(SettingChange::Unchanged);
            }
            b.versioning = Some(enabled);
            Ok(SettingChange::Changed)
        })
    }

    async fn set_quota(
        &self,
        bucket: &str,
        quota: &QuotaSpec,
    ) -> Result<SettingChange, AdminError> {
        self.record("set_quota");
        let bytes = parse_size(&quota.size)
            .ok_or_else(|| AdminError::Rejected(format!("invalid quota size '{}'", quota.size)))?;
        self.with_bucket(bucket, |b| {
            let changed = b.quota_bytes != Some(bytes);
            b.quota_bytes = Some(bytes);
            Ok(changed_if(changed))
        })
    }

    async fn set_retention(
        &self,
        bucket: &str,
        retention: &Retention,
    ) -> Result<SettingChange, AdminError> {
        self.record("set_retention");
        self.with_bucket(bucket, |b| {
            if !b.object_lock {
                return Err(AdminError::Rejected(
                    "bucket is missing object lock configuration".to_string(),
                ));
            }
            let changed = b.retention != Some(*retention);
            b.retention = Some(*retention);
            Ok(changed_if(changed))
        })
    }

    async fn set_anonymous_access(
        &self,
        bucket: &str,
        access: AnonymousAccess,
    ) -> Result<SettingChange, AdminError> {
        self.record("set_anonymous_access");
        self.with_bucket(bucket, |b| {
            let changed = b.anonymous != access;
            b.anonymous = access;
            Ok(changed_if(changed))
        })
    }

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError> {
        self.record("policy_exists");
        Ok(self.lock().policies.contains_key(name))
    }

    async fn create_policy(&self, name: &str, document: &Value) -> Result<(), AdminError> {
        self.record("create_policy");
        let mut state = self.lock();
        if state.policies.contains_key(name) {
            return Err(AdminError::AlreadyExists(format!("policy '{name}'")));
        }
        state.policies.insert(name.to_string(), document.clone());
        Ok(())
    }

    async fn replace_policy(
        &self,
        name: &str,
        document: &Value,
    ) -> Result<SettingChange, AdminError> {
        self.record("replace_policy");
        let mut state = self.lock();
        let current = state
            .policies
            .get_mut(name)
            .ok_or_else(|| AdminError::NotFound(format!("policy '{name}'")))?;
        if current == document {
            return Ok(SettingChange::Unchanged);
        }
        *current = document.clone();
        Ok(SettingChange::Changed)
    }

    async fn group_info(&self, group: &str) -> Result<Option<GroupInfo>, AdminError> {
        self.record("group_info");
        Ok(self.lock().groups.get(group).map(|g| GroupInfo {
            name: group.to_string(),
            members: g.members.iter().cloned().collect(),
            policies: g.policies.iter().cloned().collect(),
        }))
    }

    async fn group_add_member(
        &self,
        group: &str,
        user: &str,
    ) -> Result<SettingChange, AdminError> {
        self.record("group_add_member");
        let mut state = self.lock();
        if !state.users.contains_key(user) {
            return Err(AdminError::NotFound(format!("user '{user}'")));
        }
        let entry = state.groups.entry(group.to_string()).or_default();
        Ok(changed_if(entry.members.insert(user.to_string())))
    }

    async fn attach_group_policy(
        &self,
        group: &str,
        policy: &str,
    ) -> Result<SettingChange, AdminError> {
        self.record("attach_group_policy");
        let mut state = self.lock();
        if !state.policies.contains_key(policy) {
            return Err(AdminError::NotFound(format!("policy '{policy}'")));
        }
        let entry = state
            .groups
            .get_mut(group)
            .ok_or_else(|| AdminError::NotFound(format!("group '{group}'")))?;
        Ok(changed_if(entry.policies.insert(policy.to_string())))
    }

    async fn upsert_user(
        &self,
        access_key: &str,
        secret_key: &str,
    ) -> Result<UpsertOutcome, AdminError> {
        self.record("upsert_user");
        let mut state = self.lock();
        match state.users.get_mut(access_key) {
            Some(user) if user.secret_key == secret_key => Ok(UpsertOutcome::Unchanged),
            Some(user) => {
                user.secret_key = secret_key.to_string();
                Ok(UpsertOutcome::Updated)
            }
            None => {
                state.users.insert(
                    access_key.to_string(),
                    UserState {
                        secret_key: secret_key.to_string(),
                        policies: BTreeSet::new(),
                    },
                );
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn attach_user_policy(
        &self,
        user: &str,
        policy: &str,
    ) -> Result<SettingChange, AdminError> {
        self.record("attach_user_policy");
        let mut state = self.lock();
        if !state.policies.contains_key(policy) {
            return Err(AdminError::NotFound(format!("policy '{policy}'")));
        }
        let entry = state
            .users
            .get_mut(user)
            .ok_or_else(|| AdminError::NotFound(format!("user '{user}'")))?;
        Ok(changed_if(entry.policies.insert(policy.to_string())))
    }

    async fn create_service_account(&self, account: &NewServiceAccount) -> Result<(), AdminError> {
        self.record("create_service_account");
        let mut state = self.lock();
        if state.service_accounts.contains_key(&account.access_key) {
            return Err(AdminError::AlreadyExists(format!(
                "service account '{}'",
                account.access_key
            )));
        }
        if !state.users.contains_key(&account.parent_user) {
            return Err(AdminError::NotFound(format!("user '{}'", account.parent_user)));
        }
        state
            .service_accounts
            .insert(account.access_key.clone(), account.clone());
        Ok(())
    }
}
