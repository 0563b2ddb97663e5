//! Typed views of the resource specs found in a configuration document.
//!
//! Documents stay untyped until a task picks up its items; each item is then
//! deserialized into one of these structs. A bad item only fails itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version string wrapped around every policy document.
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub versioning: Option<bool>,
    #[serde(default)]
    pub object_lock: bool,
    #[serde(default)]
    pub quota: Option<QuotaSpec>,
    #[serde(default)]
    pub retention: Option<RetentionSpec>,
    #[serde(default)]
    pub policy: AnonymousAccess,
}

impl BucketSpec {
    /// Versioning the bucket should end up with, if any.
    ///
    /// Object-lock implies versioning, so it becomes the default when lock is
    /// requested and the spec says nothing.
    pub fn desired_versioning(&self) -> Option<bool> {
        match (self.versioning, self.object_lock) {
            (Some(explicit), _) => Some(explicit),
            (None, true) => Some(true),
            (None, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaSpec {
    #[serde(rename = "type", default = "default_quota_type")]
    pub kind: String,
    pub size: String,
}

fn default_quota_type() -> String {
    "hard".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetentionSpec {
    #[serde(default)]
    pub mode: RetentionMode,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub years: Option<u32>,
}

impl RetentionSpec {
    /// Resolves the validity period. Years win over days when both are set.
    pub fn validity(&self) -> Option<Validity> {
        match (self.years, self.days) {
            (Some(years), _) if years > 0 => Some(Validity::Years(years)),
            (_, Some(days)) if days > 0 => Some(Validity::Days(days)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    #[default]
    Compliance,
    Governance,
}

impl RetentionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Compliance => "COMPLIANCE",
            RetentionMode::Governance => "GOVERNANCE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Days(u32),
    Years(u32),
}

impl Validity {
    /// Short form accepted by `mc retention set`, e.g. `365d` or `7y`.
    pub fn short(&self) -> String {
        match self {
            Validity::Days(d) => format!("{d}d"),
            Validity::Years(y) => format!("{y}y"),
        }
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validity::Days(d) => write!(f, "{d} days"),
            Validity::Years(y) => write!(f, "{y} years"),
        }
    }
}

/// Default retention applied to a bucket, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub mode: RetentionMode,
    pub validity: Validity,
}

/// Anonymous (unauthenticated) access granted on a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum AnonymousAccess {
    #[default]
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "public")]
    PublicRead,
    #[serde(rename = "public-readwrite")]
    PublicReadWrite,
}

impl AnonymousAccess {
    /// The permission keyword MinIO uses for this access level.
    pub fn permission(&self) -> &'static str {
        match self {
            AnonymousAccess::Private => "none",
            AnonymousAccess::PublicRead => "download",
            AnonymousAccess::PublicReadWrite => "public",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    pub statements: Vec<Value>,
}

impl PolicySpec {
    /// Wraps the statements in the IAM policy envelope.
    pub fn document(&self) -> Value {
        serde_json::json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSpec {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountSpec {
    pub user: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parses a human byte size such as `10GB`, `1.5GiB` or `1024`.
///
/// Decimal suffixes are powers of 1000, `i` suffixes powers of 1024. A
/// fractional amount is truncated to whole bytes.
pub fn parse_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split);
    let multiplier: u128 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        "ti" | "tib" => 1 << 40,
        _ => return None,
    };

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction_value: u128 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
    let scale = 10u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;

    let bytes = whole
        .checked_mul(multiplier)?
        .checked_add(fraction_value.checked_mul(multiplier)? / scale)?;
    u64::try_from(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("10GB"), Some(10_000_000_000));
        assert_eq!(parse_size("512MiB"), Some(512 * 1024 * 1024));
        assert_eq!(parse_size(" 1024 "), Some(1024));
        assert_eq!(parse_size("1 kb"), Some(1000));
        assert_eq!(parse_size("ten gigs"), None);
        assert_eq!(parse_size("10XB"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn test_parse_size_fractional_amounts() {
        assert_eq!(parse_size("1.5GiB"), Some(3 << 29));
        assert_eq!(parse_size("0.5GB"), Some(500_000_000));
        assert_eq!(parse_size(".25KiB"), Some(256));
        assert_eq!(parse_size("2.5"), Some(2));
        assert_eq!(parse_size("1.2.3GB"), None);
        assert_eq!(parse_size(".GB"), None);
    }

    #[test]
    fn test_bucket_spec_defaults() {
        let spec: BucketSpec = serde_json::from_value(json!({"name": "docs"})).unwrap();
        assert_eq!(spec.policy, AnonymousAccess::Private);
        assert!(!spec.object_lock);
        assert_eq!(spec.desired_versioning(), None);
    }

    #[test]
    fn test_object_lock_implies_versioning_unless_explicit() {
        let locked: BucketSpec =
            serde_json::from_value(json!({"name": "a", "object_lock": true})).unwrap();
        assert_eq!(locked.desired_versioning(), Some(true));

        let explicit: BucketSpec = serde_json::from_value(
            json!({"name": "a", "object_lock": true, "versioning": false}),
        )
        .unwrap();
        assert_eq!(explicit.desired_versioning(), Some(false));
    }

    #[test]
    fn test_anonymous_access_mapping() {
        let spec: BucketSpec =
            serde_json::from_value(json!({"name": "a", "policy": "public-readwrite"})).unwrap();
        assert_eq!(spec.policy.permission(), "public");
        assert_eq!(AnonymousAccess::PublicRead.permission(), "download");
        assert_eq!(AnonymousAccess::Private.permission(), "none");

        let bad = serde_json::from_value::<BucketSpec>(json!({"name": "a", "policy": "open"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_retention_validity_prefers_years() {
        let r: RetentionSpec =
            serde_json::from_value(json!({"mode": "governance", "days": 30, "years": 2})).unwrap();
        assert_eq!(r.mode, RetentionMode::Governance);
        assert_eq!(r.validity(), Some(Validity::Years(2)));

        let days: RetentionSpec = serde_json::from_value(json!({"days": 365})).unwrap();
        assert_eq!(days.mode, RetentionMode::Compliance);
        assert_eq!(days.validity(), Some(Validity::Days(365)));
        assert_eq!(days.validity().unwrap().short(), "365d");

        let none: RetentionSpec = serde_json::from_value(json!({"years": 0})).unwrap();
        assert_eq!(none.validity(), None);
    }

    #[test]
    fn test_policy_document_envelope() {
        let spec: PolicySpec = serde_json::from_value(json!({
            "name": "rw",
            "statements": [{"Effect": "Allow", "Action": ["s3:GetObject"]}]
        }))
        .unwrap();
        let doc = spec.document();
        assert_eq!(doc["Version"], POLICY_VERSION);
        assert_eq!(doc["Statement"][0]["Effect"], "Allow");
    }
}
