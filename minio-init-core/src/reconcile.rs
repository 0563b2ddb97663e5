//! Orchestrates the resource tasks over every loaded document.
//!
//! # Responsibilities
//! - Reconcile documents in load order, each one completely before the next
//! - Run the tasks of [`REGISTRY`] in their fixed order, one at a time
//! - Hand each task the document's array for its key (empty when absent)
//! - Fold every document's outcomes into the [`RunSummary`]
//!
//! Nothing here runs concurrently: items reference each other by name through
//! the state this run has already written to the cluster.

use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

use crate::contract::{Reporter, StorageAdminClient};
use crate::load_config::LoadedDocument;
use crate::summary::{DocumentSummary, RunSummary};
use crate::tasks::{ApplyOutcome, TaskDescriptor, TaskResult, REGISTRY};

pub struct Reconciler<'a> {
    client: &'a dyn StorageAdminClient,
    reporter: &'a dyn Reporter,
    registry: &'a [TaskDescriptor],
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a dyn StorageAdminClient, reporter: &'a dyn Reporter) -> Self {
        Self {
            client,
            reporter,
            registry: &REGISTRY,
        }
    }

    /// Reconciles every document and returns the run totals.
    pub async fn run(&self, documents: &[LoadedDocument]) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(documents = documents.len(), "[RECONCILE] Starting run");
        for document in documents {
            self.reporter.document_started(&document.label);
            let span = info_span!("document", label = %document.label);
            let doc_summary = self.reconcile_document(document).instrument(span).await;
            summary.absorb(doc_summary);
        }
        info!(
            applied = summary.applied,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "[RECONCILE] Run finished"
        );
        self.reporter.summary(&summary);
        summary
    }

    /// Runs every task against one document.
    pub async fn reconcile_document(&self, document: &LoadedDocument) -> DocumentSummary {
        let mut doc_summary = DocumentSummary::new(document.label.clone());
        for task in self.registry {
            self.reporter.task_started(task);
            let result = match document.document.get(task.config_key) {
                None | Some(Value::Null) => task.kind.apply(&[], self.client, self.reporter).await,
                Some(Value::Array(items)) => {
                    info!(task = task.name, items = items.len(), "[RECONCILE] Applying task");
                    task.kind.apply(items, self.client, self.reporter).await
                }
                Some(other) => {
                    error!(task = task.name, "[RECONCILE] Config key is not a list");
                    TaskResult::failed(format!(
                        "'{}' must be a list, found {}",
                        task.config_key,
                        type_name(other)
                    ))
                }
            };
            if result.outcome == ApplyOutcome::Failed {
                error!(task = task.name, message = %result.message, "[RECONCILE] Task failed");
            }
            self.reporter.task_finished(task, &result);
            doc_summary.record(&result);
        }
        doc_summary
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
