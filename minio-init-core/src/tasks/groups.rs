//! Group policy attachment.
//!
//! Groups are created as a side effect of the users task. A group nobody is a
//! member of does not exist on the cluster; its policies cannot be attached and
//! it is reported as a warning.

use serde_json::Value;
use tracing::warn;

use super::{parse_item, ItemDisposition, ItemTally, TaskResult};
use crate::contract::{ItemStatus, Reporter, StorageAdminClient};
use crate::resources::GroupSpec;

pub async fn apply(
    items: &[Value],
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> TaskResult {
    if items.is_empty() {
        return TaskResult::skipped("No groups configured");
    }

    let mut tally = ItemTally::default();
    let mut attached = 0;
    for (index, item) in items.iter().enumerate() {
        let Some(spec) = parse_item::<GroupSpec>("group", index, item, reporter) else {
            tally.failed += 1;
            continue;
        };

        match client.group_info(&spec.name).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(group = %spec.name, "Group does not exist yet");
                reporter.item(
                    ItemStatus::Warning,
                    &format!(
                        "Warning: Group '{}' does not exist yet. \
                         Ensure at least one user is assigned to this group.",
                        spec.name
                    ),
                );
                tally.warnings += 1;
                continue;
            }
            Err(e) => {
                warn!(group = %spec.name, error = %e, "Failed to look up group");
                reporter.item(
                    ItemStatus::Failed,
                    &format!("Failed to check group {}: {e}", spec.name),
                );
                tally.failed += 1;
                continue;
            }
        }

        reporter.item(ItemStatus::Unchanged, &format!("Group exists: {}", spec.name));
        let mut changed = false;
        let mut failed = false;
        for policy in &spec.policies {
            match client.attach_group_policy(&spec.name, policy).await {
                Ok(change) => {
                    if change.changed() {
                        attached += 1;
                        reporter.item(ItemStatus::Detail, &format!("Attached policy: {policy}"));
                    }
                    changed |= change.changed();
                }
                Err(e) => {
                    warn!(group = %spec.name, policy = %policy, error = %e, "Failed to attach policy to group");
                    reporter.item(ItemStatus::Failed, &format!("Policy attach {policy}: {e}"));
                    failed = true;
                }
            }
        }
        tally.record(ItemDisposition::from_steps(false, changed, failed));
    }

    let message = format!(
        "{} group(s) processed ({attached} policies attached)",
        items.len()
    );
    TaskResult::from_tally(tally, message)
}
