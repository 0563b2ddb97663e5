//! [`StorageAdminClient`] backed by the MinIO client binary (`mc`).
//!
//! Every call runs `mc --json <args>` against a registered alias. Queries read
//! the current state first so setters can report [`SettingChange::Unchanged`]
//! without touching the cluster.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use minio_init_core::contract::{
    GroupInfo, NewBucket, NewServiceAccount, SettingChange, StorageAdminClient, UpsertOutcome,
};
use minio_init_core::error::AdminError;
use minio_init_core::resources::{parse_size, AnonymousAccess, QuotaSpec, Retention, Validity};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Admin client that shells out to `mc`.
#[derive(Debug, Clone)]
pub struct McAdminClient {
    binary: PathBuf,
    alias: String,
}

impl McAdminClient {
    /// Registers `alias` for the endpoint and returns a client bound to it.
    pub async fn connect(
        binary: impl Into<PathBuf>,
        alias: impl Into<String>,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, AdminError> {
        let client = Self {
            binary: binary.into(),
            alias: alias.into(),
        };
        client
            .run(&["alias", "set", &client.alias, endpoint, access_key, secret_key])
            .await?;
        info!(alias = %client.alias, %endpoint, "Configured mc alias");
        Ok(client)
    }

    /// A client for an alias that is already configured.
    pub fn with_alias(binary: impl Into<PathBuf>, alias: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn target(&self, bucket: &str) -> String {
        format!("{}/{}", self.alias, bucket)
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<Value>, AdminError> {
        // Credentials are positional in some commands; only the verb is logged.
        let verb = args[..args.len().min(3)].join(" ");
        debug!(binary = %self.binary.display(), command = %verb, "Running mc");

        let output = Command::new(&self.binary)
            .arg("--json")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                AdminError::Transport(format!("failed to run {}: {e}", self.binary.display()))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines = parse_json_lines(&stdout);
        if output.status.success() {
            return Ok(lines);
        }

        let message = error_message(&lines)
            .or_else(|| non_empty(String::from_utf8_lossy(&output.stderr).trim()))
            .or_else(|| non_empty(stdout.trim()))
            .unwrap_or_else(|| format!("mc exited with {}", output.status));
        warn!(command = %verb, status = ?output.status, %message, "mc command failed");
        Err(classify(message))
    }

    /// Runs a query, mapping a missing resource to `None`.
    async fn query(&self, args: &[&str]) -> Result<Option<Value>, AdminError> {
        match self.run(args).await {
            Ok(lines) => Ok(Some(lines.into_iter().next().unwrap_or(Value::Null))),
            Err(AdminError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_policy(&self, name: &str, document: &Value) -> Result<(), AdminError> {
        let file = tempfile::Builder::new()
            .prefix("policy-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| AdminError::Transport(format!("failed to create policy file: {e}")))?;
        let body = serde_json::to_vec_pretty(document)
            .map_err(|e| AdminError::Protocol(format!("failed to encode policy: {e}")))?;
        std::fs::write(file.path(), body)
            .map_err(|e| AdminError::Transport(format!("failed to write policy file: {e}")))?;

        let path = path_arg(file.path());
        self.run(&["admin", "policy", "create", &self.alias, name, &path])
            .await
            .map(|_| ())
    }

    async fn attach(&self, policy: &str, flag: &str, entity: &str) -> Result<SettingChange, AdminError> {
        match self
            .run(&["admin", "policy", "attach", &self.alias, policy, flag, entity])
            .await
        {
            Ok(_) => Ok(SettingChange::Changed),
            Err(AdminError::AlreadyExists(_)) => Ok(SettingChange::Unchanged),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StorageAdminClient for McAdminClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, AdminError> {
        Ok(self.query(&["stat", &self.target(bucket)]).await?.is_some())
    }

    async fn create_bucket(&self, bucket: &NewBucket) -> Result<(), AdminError> {
        let target = self.target(&bucket.name);
        let mut args = vec!["mb"];
        if bucket.object_lock {
            args.push("--with-lock");
        }
        if let Some(region) = bucket.region.as_deref() {
            args.extend(["--region", region]);
        }
        args.push(target.as_str());
        self.run(&args).await.map(|_| ())
    }

    async fn set_versioning(&self, bucket: &str, enabled: bool) -> Result<SettingChange, AdminError> {
        let target = self.target(bucket);
        let info = self.run(&["version", "info", &target]).await?;
        let status = info
            .first()
            .and_then(|v| v.pointer("/versioning/status"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let currently_enabled = status.eq_ignore_ascii_case("enabled");
        if currently_enabled == enabled {
            return Ok(SettingChange::Unchanged);
        }
        let verb = if enabled { "enable" } else { "suspend" };
        self.run(&["version", verb, &target]).await?;
        Ok(SettingChange::Changed)
    }

    async fn set_quota(&self, bucket: &str, quota: &QuotaSpec) -> Result<SettingChange, AdminError> {
        let desired = parse_size(&quota.size)
            .ok_or_else(|| AdminError::Rejected(format!("invalid quota size '{}'", quota.size)))?;
        let target = self.target(bucket);

        // A bucket without a quota answers `quota info` with an error.
        let current = match self.run(&["quota", "info", &target]).await {
            Ok(lines) => lines.first().and_then(|v| v.get("quota")).and_then(Value::as_u64),
            Err(AdminError::Transport(e)) => return Err(AdminError::Transport(e)),
            Err(_) => None,
        };
        if current == Some(desired) {
            return Ok(SettingChange::Unchanged);
        }
        self.run(&["quota", "set", &target, "--size", &quota.size]).await?;
        Ok(SettingChange::Changed)
    }

    async fn set_retention(
        &self,
        bucket: &str,
        retention: &Retention,
    ) -> Result<SettingChange, AdminError> {
        let target = self.target(bucket);
        let current = match self.run(&["retention", "info", "--default", &target]).await {
            Ok(lines) => lines.into_iter().next(),
            Err(AdminError::Transport(e)) => return Err(AdminError::Transport(e)),
            Err(_) => None,
        };
        if let Some(info) = current {
            let mode = info.get("mode").and_then(Value::as_str).unwrap_or_default();
            let validity = info.get("validity").and_then(Value::as_str).unwrap_or_default();
            if mode.eq_ignore_ascii_case(retention.mode.as_str())
                && validity_matches(validity, retention.validity)
            {
                return Ok(SettingChange::Unchanged);
            }
        }

        let validity = retention.validity.short();
        self.run(&[
            "retention",
            "set",
            "--default",
            retention.mode.as_str(),
            &validity,
            &target,
        ])
        .await?;
        Ok(SettingChange::Changed)
    }

    async fn set_anonymous_access(
        &self,
        bucket: &str,
        access: AnonymousAccess,
    ) -> Result<SettingChange, AdminError> {
        let target = self.target(bucket);
        let info = self.run(&["anonymous", "get", &target]).await?;
        let current = info
            .first()
            .and_then(|v| v.get("permission"))
            .and_then(Value::as_str)
            .map(normalize_permission);
        if current.as_deref() == Some(access.permission()) {
            return Ok(SettingChange::Unchanged);
        }
        self.run(&["anonymous", "set", access.permission(), &target])
            .await?;
        Ok(SettingChange::Changed)
    }

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError> {
        Ok(self
            .query(&["admin", "policy", "info", &self.alias, name])
            .await?
            .is_some())
    }

    async fn create_policy(&self, name: &str, document: &Value) -> Result<(), AdminError> {
        self.write_policy(name, document).await
    }

    async fn replace_policy(&self, name: &str, document: &Value) -> Result<SettingChange, AdminError> {
        if let Some(info) = self
            .query(&["admin", "policy", "info", &self.alias, name])
            .await?
        {
            let stored = info.pointer("/policyInfo/Policy").map(normalize_policy);
            if stored.as_ref() == Some(&normalize_policy(document)) {
                return Ok(SettingChange::Unchanged);
            }
        }

        // `admin policy create` overwrites in place; a rejection leaves the stored policy intact.
        self.write_policy(name, document).await?;
        Ok(SettingChange::Changed)
    }

    async fn group_info(&self, group: &str) -> Result<Option<GroupInfo>, AdminError> {
        let info = self
            .query(&["admin", "group", "info", &self.alias, group])
            .await?;
        Ok(info.map(|v| parse_group_info(group, &v)))
    }

    async fn group_add_member(&self, group: &str, user: &str) -> Result<SettingChange, AdminError> {
        if let Some(info) = self.group_info(group).await? {
            if info.members.iter().any(|m| m == user) {
                return Ok(SettingChange::Unchanged);
            }
        }
        self.run(&["admin", "group", "add", &self.alias, group, user])
            .await?;
        Ok(SettingChange::Changed)
    }

    async fn attach_group_policy(&self, group: &str, policy: &str) -> Result<SettingChange, AdminError> {
        self.attach(policy, "--group", group).await
    }

    async fn upsert_user(&self, access_key: &str, secret_key: &str) -> Result<UpsertOutcome, AdminError> {
        let existed = self
            .query(&["admin", "user", "info", &self.alias, access_key])
            .await?
            .is_some();
        self.run(&["admin", "user", "add", &self.alias, access_key, secret_key])
            .await?;
        // mc cannot read back secrets, so re-asserting one is not observable.
        Ok(if existed {
            UpsertOutcome::Unchanged
        } else {
            UpsertOutcome::Created
        })
    }

    async fn attach_user_policy(&self, user: &str, policy: &str) -> Result<SettingChange, AdminError> {
        self.attach(policy, "--user", user).await
    }

    async fn create_service_account(&self, account: &NewServiceAccount) -> Result<(), AdminError> {
        let mut args = vec![
            "admin",
            "user",
            "svcacct",
            "add",
            self.alias.as_str(),
            account.parent_user.as_str(),
            "--access-key",
            account.access_key.as_str(),
            "--secret-key",
            account.secret_key.as_str(),
        ];
        if let Some(name) = account.name.as_deref() {
            args.extend(["--name", name]);
        }
        if let Some(description) = account.description.as_deref() {
            args.extend(["--description", description]);
        }
        self.run(&args).await.map(|_| ())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// `mc --json` prints one object per line.
fn parse_json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

fn error_message(lines: &[Value]) -> Option<String> {
    let error = lines
        .iter()
        .find(|v| v.get("status").and_then(Value::as_str) == Some("error"))?
        .get("error")?;
    let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
    let cause = error
        .pointer("/cause/message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let text = match (message.is_empty(), cause.is_empty()) {
        (true, true) => return None,
        (false, true) => message.to_string(),
        (true, false) => cause.to_string(),
        (false, false) => format!("{message} {cause}"),
    };
    Some(text)
}

/// Maps an mc error message onto the admin error kinds the tasks branch on.
fn classify(message: String) -> AdminError {
    let lower = message.to_lowercase();
    if lower.contains("already") {
        AdminError::AlreadyExists(message)
    } else if lower.contains("does not exist")
        || lower.contains("not found")
        || lower.contains("nosuch")
    {
        AdminError::NotFound(message)
    } else if lower.contains("connection refused")
        || lower.contains("no such host")
        || lower.contains("i/o timeout")
    {
        AdminError::Transport(message)
    } else {
        AdminError::Rejected(message)
    }
}

fn normalize_permission(reported: &str) -> String {
    match reported.to_lowercase().as_str() {
        "private" | "none" => "none".to_string(),
        other => other.to_string(),
    }
}

/// Accepts the forms mc reports validity in: `365d`, `365DAYS`, `7 years`.
fn validity_matches(reported: &str, validity: Validity) -> bool {
    let compact: String = reported
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let digits: String = compact.chars().take_while(char::is_ascii_digit).collect();
    let unit = &compact[digits.len()..];
    let Ok(amount) = digits.parse::<u32>() else {
        return false;
    };
    match validity {
        Validity::Days(d) => amount == d && matches!(unit, "d" | "day" | "days"),
        Validity::Years(y) => amount == y && matches!(unit, "y" | "year" | "years"),
    }
}

/// Statement keys whose values MinIO stores as unordered sets.
const SET_VALUED_KEYS: [&str; 5] = ["Action", "NotAction", "Resource", "NotResource", "Principal"];

/// Canonical form of a policy document for comparison: a single statement
/// becomes a list, scalar set values become sorted lists, empty `Sid`s go.
fn normalize_policy(policy: &Value) -> Value {
    let mut policy = policy.clone();
    if let Some(statements) = policy.get_mut("Statement") {
        let list = match statements.take() {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        *statements = Value::Array(list.into_iter().map(normalize_statement).collect());
    }
    policy
}

fn normalize_statement(statement: Value) -> Value {
    let Value::Object(mut map) = statement else {
        return statement;
    };
    if map.get("Sid").and_then(Value::as_str) == Some("") {
        map.remove("Sid");
    }
    for key in SET_VALUED_KEYS {
        if let Some(value) = map.get_mut(key) {
            let mut taken = value.take();
            if key == "Principal" && taken.as_str() == Some("*") {
                taken = serde_json::json!({"AWS": ["*"]});
            }
            *value = sorted_set(taken);
        }
    }
    Value::Object(map)
}

fn sorted_set(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sorted_set(v)))
                .collect(),
        ),
        Value::Array(mut items) => {
            items.sort_by_key(|v| v.to_string());
            items.dedup();
            Value::Array(items)
        }
        scalar => Value::Array(vec![scalar]),
    }
}

fn parse_group_info(group: &str, info: &Value) -> GroupInfo {
    let members = info
        .get("members")
        .and_then(Value::as_array)
        .map(|m| {
            m.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let policies = info
        .get("groupPolicy")
        .and_then(Value::as_str)
        .map(|p| {
            p.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    GroupInfo {
        name: info
            .get("groupName")
            .and_then(Value::as_str)
            .unwrap_or(group)
            .to_string(),
        members,
        policies,
    }
}
