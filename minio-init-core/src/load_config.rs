//! Loads configuration documents and resolves `${VAR}` placeholders.
//!
//! # Responsibilities
//! - Read a document from disk; a missing file is not an error (`Ok(None)`)
//! - Parse JSON, or YAML for `.yaml`/`.yml` files, into a JSON object
//! - Substitute every `${NAME}` in every string value, at any depth, before any
//!   task sees the document
//! - Discover the built-in default document and the optional user document
//!
//! # Errors
//! Any failure is a [`ConfigError`] carrying the offending path. Resolution is
//! total: an unset variable fails the whole document, it is never left as-is.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::contract::{NoticeLevel, Reporter};
use crate::error::{ConfigError, MissingVariable};

pub const DEFAULT_CONFIG_PATH: &str = "/app/config/default.json";
pub const FALLBACK_USER_CONFIG_PATH: &str = "/app/config/init.json";

/// A parsed, fully resolved configuration document.
pub type ResourceDocument = Map<String, Value>;

/// A document ready for reconciliation, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub label: String,
    pub path: PathBuf,
    pub document: ResourceDocument,
}

/// Where to look for configuration documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSources {
    /// Built-in document, always attempted first.
    pub default_path: PathBuf,
    /// User document override (`MINIO_INIT_CONFIG`).
    pub user_override: Option<PathBuf>,
    /// User document used when no override is present.
    pub fallback_user_path: PathBuf,
}

impl Default for DocumentSources {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            user_override: None,
            fallback_user_path: PathBuf::from(FALLBACK_USER_CONFIG_PATH),
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex is valid"))
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Replaces every `${NAME}` token in `input` using `lookup`.
pub fn resolve_str(
    input: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, MissingVariable> {
    let mut resolved = String::with_capacity(input.len());
    let mut last = 0;
    for caps in placeholder_pattern().captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(name.as_str()).ok_or_else(|| MissingVariable(name.as_str().to_string()))?;
        resolved.push_str(&input[last..whole.start()]);
        resolved.push_str(&value);
        last = whole.end();
    }
    resolved.push_str(&input[last..]);
    Ok(resolved)
}

/// Resolves placeholders depth-first through strings, arrays and object values.
/// Object keys are left untouched.
pub fn resolve_placeholders(
    value: Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Value, MissingVariable> {
    match value {
        Value::String(s) => Ok(Value::String(resolve_str(&s, lookup)?)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| resolve_placeholders(item, lookup))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| resolve_placeholders(v, lookup).map(|v| (k, v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigError> {
    let parsed = if is_yaml(path) {
        serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| {
        error!(config_path = ?path, %reason, "Failed to parse config document");
        ConfigError::MalformedDocument {
            path: path.to_path_buf(),
            reason,
        }
    })
}

/// Loads a document, resolving placeholders against the process environment.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Option<ResourceDocument>, ConfigError> {
    load_document_with(path, &process_env)
}

/// Loads a document, resolving placeholders with the given lookup.
pub fn load_document_with<P: AsRef<Path>>(
    path: P,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<ResourceDocument>, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(config_path = ?path_ref, "Config file does not exist");
            return Ok(None);
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let raw = parse_document(path_ref, &content)?;
    let resolved = resolve_placeholders(raw, lookup).map_err(|MissingVariable(name)| {
        error!(config_path = ?path_ref, variable = %name, "Unresolved placeholder in config");
        ConfigError::UnresolvedPlaceholder {
            path: path_ref.to_path_buf(),
            name,
        }
    })?;

    match resolved {
        Value::Object(document) => {
            info!(config_path = ?path_ref, keys = document.len(), "Config document loaded");
            Ok(Some(document))
        }
        other => Err(ConfigError::MalformedDocument {
            path: path_ref.to_path_buf(),
            reason: format!("top-level value must be an object, found {}", kind_of(&other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Picks the user document path: the override if it exists, else the fallback.
fn user_document_path(sources: &DocumentSources, reporter: &dyn Reporter) -> Option<PathBuf> {
    if let Some(path) = &sources.user_override {
        if path.exists() {
            return Some(path.clone());
        }
        warn!(config_path = ?path, "User config override not found, trying fallback path");
        reporter.notice(
            NoticeLevel::Warning,
            &format!(
                "Warning: user config not found: {} (falling back to {})",
                path.display(),
                sources.fallback_user_path.display()
            ),
        );
    }
    sources
        .fallback_user_path
        .exists()
        .then(|| sources.fallback_user_path.clone())
}

/// Discovers and loads documents in processing order: `default`, then `user`.
pub fn discover_documents(
    sources: &DocumentSources,
    reporter: &dyn Reporter,
) -> Result<Vec<LoadedDocument>, ConfigError> {
    discover_documents_with(sources, reporter, &process_env)
}

pub fn discover_documents_with(
    sources: &DocumentSources,
    reporter: &dyn Reporter,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<LoadedDocument>, ConfigError> {
    let mut documents = Vec::new();

    match load_document_with(&sources.default_path, lookup)? {
        Some(document) => documents.push(LoadedDocument {
            label: "default".to_string(),
            path: sources.default_path.clone(),
            document,
        }),
        None => {
            warn!(config_path = ?sources.default_path, "Built-in default config not found");
            reporter.notice(
                NoticeLevel::Warning,
                &format!(
                    "Warning: built-in default not found: {}",
                    sources.default_path.display()
                ),
            );
        }
    }

    if let Some(path) = user_document_path(sources, reporter) {
        if path == sources.default_path {
            info!(config_path = ?path, "User config is the default config, not loading twice");
        } else if let Some(document) = load_document_with(&path, lookup)? {
            documents.push(LoadedDocument {
                label: "user".to_string(),
                path,
                document,
            });
        }
    }

    info!(documents = documents.len(), "Configuration discovery complete");
    Ok(documents)
}
