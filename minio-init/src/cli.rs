//! # minio-init CLI interface
//!
//! Command parsing and orchestration for the `minio-init` binary. Everything
//! that decides *what* to change on the cluster lives in `minio-init-core`;
//! this module wires the process inputs, the `mc` adapter and the console
//! reporter to it.
//!
//! ## Commands
//! - `apply`: load documents, wait for the cluster, reconcile, print the summary.
//! - `validate`: load and resolve documents only; never contacts the cluster.
//!
//! For programmatic use (integration tests), build a [`Cli`] and call [`run`].

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minio_init_core::contract::{NoticeLevel, Reporter};
use minio_init_core::load_config::{discover_documents, LoadedDocument};
use minio_init_core::reconcile::Reconciler;
use minio_init_core::tasks::REGISTRY;
use serde_json::Value;

use crate::console::ConsoleReporter;
use crate::health;
use crate::mc::McAdminClient;
use crate::settings::{ConnectionArgs, DocumentArgs};

/// Declarative MinIO initialisation.
#[derive(Debug, Parser)]
#[command(
    name = "minio-init",
    version,
    about = "Apply declared buckets, policies, users, groups and service accounts to a MinIO cluster"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the cluster with the configuration documents
    Apply {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        documents: DocumentArgs,
    },
    /// Load and resolve the configuration documents without contacting the cluster
    Validate {
        #[command(flatten)]
        documents: DocumentArgs,
    },
}

/// CLI entrypoint shared by `main` and the integration tests. Returns the
/// process exit status.
pub async fn run(cli: Cli) -> Result<u8> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Apply {
            connection,
            documents,
        } => apply(connection, documents).await,
        Commands::Validate { documents } => validate(documents),
    }
}

async fn apply(connection: ConnectionArgs, documents: DocumentArgs) -> Result<u8> {
    let reporter = ConsoleReporter::stdout();
    reporter.banner(&connection.endpoint);
    connection.validate()?;

    let loaded = discover_documents(&documents.sources(), &reporter)
        .context("failed to load configuration")?;
    if loaded.is_empty() {
        reporter.notice(NoticeLevel::Warning, "No configuration files found");
        return Ok(0);
    }

    health::wait_for_server(
        &connection.endpoint,
        connection.wait_timeout(),
        health::POLL_INTERVAL,
    )
    .await?;
    reporter.notice(NoticeLevel::Success, "MinIO server is ready");

    let client = McAdminClient::connect(
        connection.mc_binary.clone(),
        connection.alias.clone(),
        &connection.endpoint,
        &connection.root_user,
        &connection.root_password,
    )
    .await
    .context("failed to configure mc alias")?;

    tracing::info!(command = "apply", documents = loaded.len(), "Starting reconciliation");
    let summary = Reconciler::new(&client, &reporter).run(&loaded).await;
    tracing::info!(command = "apply", failed = summary.failed, "Reconciliation complete");
    Ok(summary.exit_code())
}

fn validate(documents: DocumentArgs) -> Result<u8> {
    let reporter = ConsoleReporter::stdout();
    let loaded = discover_documents(&documents.sources(), &reporter)
        .context("failed to load configuration")?;
    if loaded.is_empty() {
        reporter.notice(NoticeLevel::Warning, "No configuration files found");
        return Ok(0);
    }

    for document in &loaded {
        reporter.notice(
            NoticeLevel::Info,
            &format!("{} ({}):", document.label, document.path.display()),
        );
        for line in item_counts(document) {
            reporter.notice(NoticeLevel::Info, &line);
        }
    }
    reporter.notice(NoticeLevel::Success, "Configuration is valid");
    Ok(0)
}

/// One line per registry task: how many items the document declares for it.
fn item_counts(document: &LoadedDocument) -> Vec<String> {
    REGISTRY
        .iter()
        .map(|task| {
            let count = match document.document.get(task.config_key) {
                Some(Value::Array(items)) => items.len().to_string(),
                None | Some(Value::Null) => "0".to_string(),
                Some(_) => "not a list".to_string(),
            };
            format!("  {}: {count}", task.name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_item_counts_per_task() {
        let document = LoadedDocument {
            label: "user".to_string(),
            path: PathBuf::from("init.json"),
            document: json!({"buckets": [{"name": "a"}, {"name": "b"}], "groups": {}})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        };
        let lines = item_counts(&document);
        assert_eq!(lines[0], "  Buckets: 2");
        assert_eq!(lines[1], "  Policies: 0");
        assert_eq!(lines[3], "  Groups: not a list");
    }

    #[test]
    fn test_parse_apply_with_env_defaults() {
        let cli = Cli::parse_from(["minio-init", "apply", "--config", "/tmp/x.json"]);
        match cli.command {
            Commands::Apply { documents, .. } => {
                assert_eq!(documents.config, Some(PathBuf::from("/tmp/x.json")));
            }
            other => panic!("expected apply, got {other:?}"),
        }
    }
}
