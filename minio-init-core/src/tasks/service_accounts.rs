//! Service account creation.
//!
//! An access key that already exists is left alone: re-running never rotates
//! service account secrets.

use serde_json::Value;
use tracing::{info, warn};

use super::{parse_item, ItemDisposition, ItemTally, TaskResult};
use crate::contract::{ItemStatus, NewServiceAccount, Reporter, StorageAdminClient};
use crate::error::AdminError;
use crate::resources::ServiceAccountSpec;

pub async fn apply(
    items: &[Value],
    client: &dyn StorageAdminClient,
    reporter: &dyn Reporter,
) -> TaskResult {
    if items.is_empty() {
        return TaskResult::skipped("No service accounts configured");
    }

    let mut tally = ItemTally::default();
    for (index, item) in items.iter().enumerate() {
        let Some(spec) =
            parse_item::<ServiceAccountSpec>("service account", index, item, reporter)
        else {
            tally.failed += 1;
            continue;
        };

        let account = NewServiceAccount {
            parent_user: spec.user.clone(),
            access_key: spec.access_key.clone(),
            secret_key: spec.secret_key.clone(),
            name: spec.name.clone().filter(|n| !n.is_empty()),
            description: spec.description.clone().filter(|d| !d.is_empty()),
        };

        let disposition = match client.create_service_account(&account).await {
            Ok(()) => {
                info!(access_key = %spec.access_key, parent = %spec.user, "Created service account");
                reporter.item(
                    ItemStatus::Created,
                    &format!(
                        "Created service account: {} (parent: {})",
                        spec.access_key, spec.user
                    ),
                );
                ItemDisposition::Created
            }
            Err(AdminError::AlreadyExists(_)) => {
                reporter.item(
                    ItemStatus::Unchanged,
                    &format!("Service account exists: {}", spec.access_key),
                );
                ItemDisposition::Unchanged
            }
            Err(e) => {
                warn!(access_key = %spec.access_key, error = %e, "Failed to create service account");
                reporter.item(
                    ItemStatus::Failed,
                    &format!("Failed to create SA {}: {e}", spec.access_key),
                );
                ItemDisposition::Failed
            }
        };
        tally.record(disposition);
    }

    let message = format!(
        "{} service account(s) processed ({} created)",
        items.len(),
        tally.created
    );
    TaskResult::from_tally(tally, message)
}
