//! Process inputs: cluster connection and document locations.
//!
//! Every value can come from a flag or from the environment variable the
//! container image sets; flags win.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use minio_init_core::load_config::{
    DocumentSources, DEFAULT_CONFIG_PATH, FALLBACK_USER_CONFIG_PATH,
};

pub const DEFAULT_ENDPOINT: &str = "http://minio-server:9000";
pub const DEFAULT_ALIAS: &str = "minio";

/// How to reach and authenticate against the cluster.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Cluster endpoint URL
    #[arg(long, env = "MINIO_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Administrative access key
    #[arg(long, env = "MINIO_ROOT_USER", default_value = "minioadmin")]
    pub root_user: String,

    /// Administrative secret key
    #[arg(
        long,
        env = "MINIO_ROOT_PASSWORD",
        default_value = "minioadmin",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub root_password: String,

    /// Seconds to wait for the cluster health endpoint
    #[arg(long, env = "MINIO_WAIT_TIMEOUT", default_value_t = 60)]
    pub wait_timeout: u64,

    /// Alias registered with the admin client
    #[arg(long, default_value = DEFAULT_ALIAS)]
    pub alias: String,

    /// Admin client binary
    #[arg(long, env = "MINIO_INIT_MC", default_value = "mc")]
    pub mc_binary: PathBuf,
}

impl ConnectionArgs {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout)
    }

    /// Fails when the admin secret is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root_password.is_empty() {
            anyhow::bail!("MINIO_ROOT_PASSWORD not set");
        }
        if self.root_user.is_empty() {
            anyhow::bail!("MINIO_ROOT_USER not set");
        }
        Ok(())
    }
}

/// Where configuration documents are read from.
#[derive(Debug, Clone, Args)]
pub struct DocumentArgs {
    /// User configuration document (overrides the fallback path)
    #[arg(long, env = "MINIO_INIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Built-in default document, always applied first
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub default_config: PathBuf,

    /// User document used when no override is given
    #[arg(long, default_value = FALLBACK_USER_CONFIG_PATH)]
    pub fallback_config: PathBuf,
}

impl DocumentArgs {
    pub fn sources(&self) -> DocumentSources {
        DocumentSources {
            default_path: self.default_config.clone(),
            user_override: self.config.clone().filter(|p| !p.as_os_str().is_empty()),
            fallback_user_path: self.fallback_config.clone(),
        }
    }
}
