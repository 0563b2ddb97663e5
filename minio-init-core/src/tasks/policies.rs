//! IAM policy creation.
//!
//! Policies are upserted by name so a changed declaration replaces the stored
//! content instead of leaving a stale version behind.

use serde_json::Value;
use tracing::{info, warn};

use super::{parse_item, ItemDisposition, ItemTally, TaskResult};
use crate::contract::{ItemStatus, Reporter, SettingChange, StorageAdminClient};
use crate::resources::PolicySpec;

pub async fn apply(
    items: &[Value],
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> TaskResult {
    if items.is_empty() {
        return TaskResult::skipped("No policies configured");
    }

    let mut tally = ItemTally::default();
    for (index, item) in items.iter().enumerate() {
        let Some(spec) = parse_item::<PolicySpec>("policy", index, item, reporter) else {
            tally.failed += 1;
            continue;
        };
        tally.record(upsert_policy(&spec, client, reporter).await);
    }

    let message = format!(
        "{} policy/policies processed ({} created, {} updated)",
        items.len(),
        tally.created,
        tally.updated
    );
    TaskResult::from_tally(tally, message)
}

async fn upsert_policy(
    spec: &PolicySpec,
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> ItemDisposition {
    let name = spec.name.as_str();
    let document = spec.document();

    let exists = match client.policy_exists(name).await {
        Ok(exists) => exists,
        Err(e) => {
            warn!(policy = name, error = %e, "Failed to look up policy");
            reporter.item(ItemStatus::Failed, &format!("Failed to check policy {name}: {e}"));
            return ItemDisposition::Failed;
        }
    };

    if !exists {
        return match client.create_policy(name, &document).await {
            Ok(()) => {
                info!(policy = name, "Created policy");
                reporter.item(ItemStatus::Created, &format!("Created policy: {name}"));
                ItemDisposition::Created
            }
            Err(e) => {
                warn!(policy = name, error = %e, "Failed to create policy");
                reporter.item(ItemStatus::Failed, &format!("Failed to create policy {name}: {e}"));
                ItemDisposition::Failed
            }
        };
    }

    match client.replace_policy(name, &document).await {
        Ok(SettingChange::Changed) => {
            info!(policy = name, "Updated policy");
            reporter.item(ItemStatus::Updated, &format!("Updated policy: {name}"));
            ItemDisposition::Updated
        }
        Ok(SettingChange::Unchanged) => {
            reporter.item(ItemStatus::Unchanged, &format!("Policy up to date: {name}"));
            ItemDisposition::Unchanged
        }
        Err(e) => {
            warn!(policy = name, error = %e, "Failed to update policy");
            reporter.item(ItemStatus::Failed, &format!("Failed to update policy {name}: {e}"));
            ItemDisposition::Failed
        }
    }
}
