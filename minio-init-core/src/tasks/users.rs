//! User creation, group membership and direct policy attachment.
//!
//! Runs before the groups task. Adding a user to a group is what creates the
//! group on the cluster, so every group a user lists exists once this task is
//! done.

use serde_json::Value;
use tracing::{info, warn};

use super::{parse_item, ItemDisposition, ItemTally, TaskResult};
use crate::contract::{ItemStatus, Reporter, StorageAdminClient, UpsertOutcome};
use crate::resources::UserSpec;

pub async fn apply(
    items: &[Value],
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> TaskResult {
    if items.is_empty() {
        return TaskResult::skipped("No users configured");
    }

    let mut tally = ItemTally::default();
    for (index, item) in items.iter().enumerate() {
        let Some(spec) = parse_item::<UserSpec>("user", index, item, reporter) else {
            tally.failed += 1;
            continue;
        };
        tally.record(converge_user(&spec, client, reporter).await);
    }

    let message = format!(
        "{} user(s) processed ({} created, {} updated)",
        items.len(),
        tally.created,
        tally.updated
    );
    TaskResult::from_tally(tally, message)
}

async fn converge_user(
    spec: &UserSpec,
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> ItemDisposition {
    let user = spec.access_key.as_str();

    let created = match client.upsert_user(user, &spec.secret_key).await {
        Ok(UpsertOutcome::Created) => {
            info!(user, "Created user");
            reporter.item(ItemStatus::Created, &format!("Created user: {user}"));
            true
        }
        Ok(UpsertOutcome::Updated) => {
            reporter.item(ItemStatus::Updated, &format!("Updated user: {user}"));
            return membership_and_policies(spec, client, reporter, true).await;
        }
        Ok(UpsertOutcome::Unchanged) => {
            reporter.item(ItemStatus::Unchanged, &format!("User exists: {user}"));
            false
        }
        Err(e) => {
            warn!(user, error = %e, "Failed to create user");
            reporter.item(ItemStatus::Failed, &format!("Failed to create user {user}: {e}"));
            return ItemDisposition::Failed;
        }
    };

    let disposition = membership_and_policies(spec, client, reporter, false).await;
    match (created, disposition) {
        (true, ItemDisposition::Failed) => ItemDisposition::Failed,
        (true, _) => ItemDisposition::Created,
        (false, d) => d,
    }
}

/// Adds the user to its groups and attaches its direct policies.
/// `already_changed` carries a change from the upsert step.
async fn membership_and_policies(
    spec: &UserSpec,
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
    already_changed: bool,
) -> ItemDisposition {
    let user = spec.access_key.as_str();
    let mut changed = already_changed;
    let mut failed = false;

    for group in &spec.groups {
        match client.group_add_member(group, user).await {
            Ok(change) => {
                if change.changed() {
                    reporter.item(ItemStatus::Detail, &format!("Added to group: {group}"));
                }
                changed |= change.changed();
            }
            Err(e) => {
                warn!(user, group = %group, error = %e, "Failed to add user to group");
                reporter.item(ItemStatus::Failed, &format!("Group add {group}: {e}"));
                failed = true;
            }
        }
    }

    for policy in &spec.policies {
        match client.attach_user_policy(user, policy).await {
            Ok(change) => {
                if change.changed() {
                    reporter.item(ItemStatus::Detail, &format!("Attached policy: {policy}"));
                }
                changed |= change.changed();
            }
            Err(e) => {
                warn!(user, policy = %policy, error = %e, "Failed to attach policy to user");
                reporter.item(ItemStatus::Failed, &format!("Policy attach {policy}: {e}"));
                failed = true;
            }
        }
    }

    ItemDisposition::from_steps(false, changed, failed)
}
