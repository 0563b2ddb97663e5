//! Bucket creation and configuration.
//!
//! Object-lock can only be enabled when a bucket is created. Requesting it for
//! an existing bucket produces a warning; there is no call that retrofits it.
//! Every other setting (versioning, quota, retention, anonymous access) is
//! re-applied on every run and reports whether it actually changed.

use serde_json::Value;
use tracing::{info, warn};

use super::{parse_item, ItemDisposition, ItemTally, TaskResult};
use crate::contract::{ItemStatus, NewBucket, Reporter, SettingChange, StorageAdminClient};
use crate::error::AdminError;
use crate::resources::{BucketSpec, Retention};

pub async fn apply(
    items: &[Value],
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> TaskResult {
    if items.is_empty() {
        return TaskResult::skipped("No buckets configured");
    }

    let mut tally = ItemTally::default();
    for (index, item) in items.iter().enumerate() {
        let Some(spec) = parse_item::<BucketSpec>("bucket", index, item, reporter) else {
            tally.failed += 1;
            continue;
        };
        let disposition = converge_bucket(&spec, client, reporter, &mut tally).await;
        tally.record(disposition);
    }

    let message = format!(
        "{} bucket(s) processed ({} created{})",
        items.len(),
        tally.created,
        if tally.updated > 0 {
            format!(", {} updated", tally.updated)
        } else {
            String::new()
        }
    );
    TaskResult::from_tally(tally, message)
}

/// Tracks the sub-steps of one bucket.
#[derive(Default)]
struct Steps {
    created: bool,
    changed: bool,
    failed: bool,
}

impl Steps {
    fn absorb(&mut self, change: SettingChange) {
        self.changed |= change.changed();
    }
}

async fn converge_bucket(
    spec: &BucketSpec,
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
    tally: &mut ItemTally,
) -> ItemDisposition {
    let name = spec.name.as_str();
    let mut steps = Steps::default();

    let exists = match client.bucket_exists(name).await {
        Ok(exists) => exists,
        Err(e) => {
            fail(reporter, &format!("Failed to check bucket {name}: {e}"));
            return ItemDisposition::Failed;
        }
    };

    if !exists {
        let request = NewBucket {
            name: spec.name.clone(),
            region: spec.region.clone().filter(|r| !r.is_empty()),
            object_lock: spec.object_lock,
        };
        if let Err(e) = client.create_bucket(&request).await {
            fail(reporter, &format!("Failed to create bucket {name}: {e}"));
            return ItemDisposition::Failed;
        }
        steps.created = true;
        let lock_note = if spec.object_lock { " (with object-lock)" } else { "" };
        info!(bucket = name, object_lock = spec.object_lock, "Created bucket");
        reporter.item(ItemStatus::Created, &format!("Created bucket: {name}{lock_note}"));
    } else {
        reporter.item(ItemStatus::Unchanged, &format!("Bucket exists: {name}"));
        if spec.object_lock {
            warn!(bucket = name, "object_lock requested for an existing bucket");
            reporter.item(
                ItemStatus::Warning,
                "Warning: object_lock requested but bucket already exists. \
                 Object-lock can only be enabled at creation time.",
            );
            tally.warnings += 1;
        }
    }

    if let Some(enabled) = spec.desired_versioning() {
        match client.set_versioning(name, enabled).await {
            Ok(change) => {
                if change.changed() {
                    let state = if enabled { "enabled" } else { "suspended" };
                    reporter.item(ItemStatus::Detail, &format!("Versioning: {state}"));
                }
                steps.absorb(change);
            }
            Err(e) => step_failed(reporter, &mut steps, "Versioning", &e),
        }
    }

    if let Some(quota) = &spec.quota {
        match client.set_quota(name, quota).await {
            Ok(change) => {
                if change.changed() {
                    reporter.item(
                        ItemStatus::Detail,
                        &format!("Quota: {} {}", quota.kind, quota.size),
                    );
                }
                steps.absorb(change);
            }
            Err(e) => step_failed(reporter, &mut steps, "Quota set", &e),
        }
    }

    if let Some(retention_spec) = &spec.retention {
        match retention_spec.validity() {
            None => {
                fail(
                    reporter,
                    &format!("Retention for {name} needs a non-zero 'days' or 'years'"),
                );
                steps.failed = true;
            }
            Some(validity) => {
                let retention = Retention {
                    mode: retention_spec.mode,
                    validity,
                };
                // Only a bucket this run created with object-lock is known to be locked.
                let locked_here = steps.created && spec.object_lock;
                match client.set_retention(name, &retention).await {
                    Ok(change) => {
                        if change.changed() {
                            reporter.item(
                                ItemStatus::Detail,
                                &format!("Retention: {} {}", retention.mode.as_str(), validity),
                            );
                        }
                        steps.absorb(change);
                    }
                    Err(e) if !locked_here && !matches!(e, AdminError::Transport(_)) => {
                        warn!(bucket = name, error = %e, "Retention rejected on bucket without object-lock");
                        reporter.item(
                            ItemStatus::Warning,
                            &format!("Retention set failed: {e}"),
                        );
                        reporter.item(
                            ItemStatus::Warning,
                            "Hint: retention requires object_lock to be enabled",
                        );
                        tally.warnings += 1;
                    }
                    Err(e) => step_failed(reporter, &mut steps, "Retention set", &e),
                }
            }
        }
    }

    match client.set_anonymous_access(name, spec.policy).await {
        Ok(change) => {
            if change.changed() {
                reporter.item(
                    ItemStatus::Detail,
                    &format!("Anonymous access: {}", spec.policy.permission()),
                );
            }
            steps.absorb(change);
        }
        Err(e) => step_failed(reporter, &mut steps, "Anonymous access", &e),
    }

    ItemDisposition::from_steps(steps.created, steps.changed, steps.failed)
}

fn step_failed(reporter: &dyn Reporter, steps: &mut Steps, what: &str, error: &AdminError) {
    fail(reporter, &format!("{what} failed: {error}"));
    steps.failed = true;
}

fn fail(reporter: &dyn Reporter, message: &str) {
    warn!(detail = message, "Bucket step failed");
    reporter.item(ItemStatus::Failed, message);
}
