//! Error types shared by the loader, the tasks and the admin client adapters.

use std::path::PathBuf;

/// Failure while loading or resolving a configuration document.
///
/// Every variant is fatal for the run: nothing is reconciled once a document
/// cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config document {path:?}: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("environment variable '{name}' is not set (referenced in {path:?})")]
    UnresolvedPlaceholder { path: PathBuf, name: String },
}

/// A `${NAME}` token referring to a variable the lookup could not provide.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("environment variable '{0}' is not set")]
pub struct MissingVariable(pub String);

/// Error returned by a [`StorageAdminClient`](crate::contract::StorageAdminClient) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// The resource the call would create is already present.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A resource the call depends on does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing system refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The backing system could not be reached at all.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backing system answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    Protocol(String),
}
