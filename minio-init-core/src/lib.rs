#![doc = "minio-init-core: reconciliation engine for declarative MinIO initialisation."]

//! This crate holds everything that decides *what* to apply: document loading
//! and placeholder resolution, the ordered resource tasks, the reconciler and
//! the run summary. Talking to a real cluster and printing to a terminal live
//! in the `minio-init` binary crate, behind the ports in [`contract`].
//!
//! # Usage
//! Load documents with [`load_config::discover_documents`], then hand them to a
//! [`reconcile::Reconciler`] together with a client and a reporter.

pub mod contract;
pub mod error;
pub mod load_config;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod memory;
pub mod reconcile;
pub mod report;
pub mod resources;
pub mod summary;
pub mod tasks;
