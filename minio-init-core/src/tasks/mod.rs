//! The fixed, ordered set of resource tasks.
//!
//! Order is load-bearing: later kinds refer to earlier ones by name.
//! Buckets and policies come first. Users run before groups because a group
//! only exists once it has a member, and adding a user to a group is what
//! creates it; the groups task then attaches policies to groups that now
//! exist. Service accounts hang off users and come last.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::contract::{ItemStatus, Reporter, StorageAdminClient};

pub mod buckets;
pub mod groups;
pub mod policies;
pub mod service_accounts;
pub mod users;

/// The closed set of resource kinds the engine knows how to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buckets,
    Policies,
    Users,
    Groups,
    ServiceAccounts,
}

impl ResourceKind {
    /// Converges every item of this kind, one after another.
    pub async fn apply(
        self,
        items: &[Value],
        client: &dyn StorageAdminClient,
        reporter: &dyn Reporter,
    ) -> TaskResult {
        match self {
            ResourceKind::Buckets => buckets::apply(items, client, reporter).await,
            ResourceKind::Policies => policies::apply(items, client, reporter).await,
            ResourceKind::Users => users::apply(items, client, reporter).await,
            ResourceKind::Groups => groups::apply(items, client, reporter).await,
            ResourceKind::ServiceAccounts => {
                service_accounts::apply(items, client, reporter).await
            }
        }
    }
}

/// Static description of one task in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub config_key: &'static str,
    pub position: u8,
    pub kind: ResourceKind,
}

pub const REGISTRY: [TaskDescriptor; 5] = [
    TaskDescriptor {
        name: "Buckets",
        description: "Create and configure S3 buckets",
        config_key: "buckets",
        position: 1,
        kind: ResourceKind::Buckets,
    },
    TaskDescriptor {
        name: "Policies",
        description: "Create custom IAM policies",
        config_key: "policies",
        position: 2,
        kind: ResourceKind::Policies,
    },
    TaskDescriptor {
        name: "Users",
        description: "Create users and assign group membership",
        config_key: "users",
        position: 3,
        kind: ResourceKind::Users,
    },
    TaskDescriptor {
        name: "Groups",
        description: "Attach policies to groups",
        config_key: "groups",
        position: 4,
        kind: ResourceKind::Groups,
    },
    TaskDescriptor {
        name: "Service Accounts",
        description: "Create service accounts with explicit credentials",
        config_key: "service_accounts",
        position: 5,
        kind: ResourceKind::ServiceAccounts,
    },
];

/// Roll-up of one task invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No items were configured for this kind.
    Skipped,
    /// At least one item was created or changed.
    Applied,
    /// Every item already matched the declared state.
    Unchanged,
    /// At least one item could not be converged.
    Failed,
}

/// Per-item counts collected while a task runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemTally {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl ItemTally {
    /// Items that were created or mutated.
    pub fn applied(&self) -> usize {
        self.created + self.updated
    }

    pub fn outcome(&self) -> ApplyOutcome {
        if self.failed > 0 {
            ApplyOutcome::Failed
        } else if self.applied() > 0 {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Unchanged
        }
    }

    /// Records the disposition of one item.
    pub fn record(&mut self, disposition: ItemDisposition) {
        match disposition {
            ItemDisposition::Created => self.created += 1,
            ItemDisposition::Updated => self.updated += 1,
            ItemDisposition::Unchanged => self.unchanged += 1,
            ItemDisposition::Failed => self.failed += 1,
        }
    }

    /// Appends the non-zero trailing counters to a task message.
    fn suffix(&self) -> String {
        let mut out = String::new();
        if self.warnings > 0 {
            out.push_str(&format!(", {} warning(s)", self.warnings));
        }
        if self.failed > 0 {
            out.push_str(&format!(", {} failed", self.failed));
        }
        out
    }
}

/// Final state of a single item after every sub-step was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDisposition {
    Created,
    Updated,
    Unchanged,
    Failed,
}

impl ItemDisposition {
    /// Folds the sub-steps of an item: any failure fails it, any change on an
    /// existing item updates it.
    fn from_steps(created: bool, changed: bool, failed: bool) -> Self {
        if failed {
            ItemDisposition::Failed
        } else if created {
            ItemDisposition::Created
        } else if changed {
            ItemDisposition::Updated
        } else {
            ItemDisposition::Unchanged
        }
    }
}

/// What a task reports back to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub outcome: ApplyOutcome,
    pub message: String,
    pub tally: ItemTally,
}

impl TaskResult {
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            outcome: ApplyOutcome::Skipped,
            message: message.into(),
            tally: ItemTally::default(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: ApplyOutcome::Failed,
            message: message.into(),
            tally: ItemTally {
                failed: 1,
                ..ItemTally::default()
            },
        }
    }

    fn from_tally(tally: ItemTally, message: String) -> Self {
        Self {
            outcome: tally.outcome(),
            message: format!("{message}{}", tally.suffix()),
            tally,
        }
    }
}

/// Deserializes one untyped item, reporting and returning `None` on failure.
fn parse_item<T: DeserializeOwned>(
    kind: &str,
    index: usize,
    item: &Value,
    reporter: &dyn Reporter,
) -> Option<T> {
    match serde_json::from_value::<T>(item.clone()) {
        Ok(spec) => Some(spec),
        Err(e) => {
            warn!(kind, index, error = %e, "Invalid item in configuration");
            reporter.item(
                ItemStatus::Failed,
                &format!("Invalid {kind} at index {index}: {e}"),
            );
            None
        }
    }
}
