//! Data model shared by the orchestrator, adapters and callers
//!
//! Hosts in [`DnsRecord`] are provider-relative: `@` for the apex, `www`,
//! `_verify`. Adapters translate to and from their provider's addressing
//! convention with [`to_relative_host`] and [`to_absolute_host`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record type
///
/// Unknown types are kept verbatim so that a fetched record set can be
/// resubmitted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Mx,
    Ns,
    Srv,
    Caa,
    Other(String),
}

impl RecordType {
    /// Upper-case wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(name) => name,
        }
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            "MX" => RecordType::Mx,
            "NS" => RecordType::Ns,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        RecordType::from(value.as_str())
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single DNS record in provider-relative form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Relative host (`@`, `www`, `_verify`)
    pub host: String,
    /// Record value
    pub value: String,
    /// Time-to-live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// MX/SRV preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl DnsRecord {
    /// Create a record without TTL or priority
    pub fn new(record_type: RecordType, host: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            record_type,
            host: host.into(),
            value: value.into(),
            ttl: None,
            priority: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether this record occupies the same (host, type) slot as `other`
    pub fn same_slot(&self, other: &DnsRecord) -> bool {
        self.record_type == other.record_type
            && self.host.eq_ignore_ascii_case(&other.host)
    }

    /// Whether the values are equal once quoting and trailing dots are dropped
    ///
    /// TXT values compare case-sensitively; everything else ignores case.
    pub fn same_value(&self, other: &DnsRecord) -> bool {
        let current = normalize_value(&self.value);
        let wanted = normalize_value(&other.value);
        match self.record_type {
            RecordType::Txt => current == wanted,
            _ => current.eq_ignore_ascii_case(&wanted),
        }
    }

    /// Same slot and same value
    pub fn same_record(&self, other: &DnsRecord) -> bool {
        self.same_slot(other) && self.same_value(other)
    }
}

fn normalize_value(value: &str) -> String {
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value.trim_end_matches('.').to_string()
}

/// Translate a provider host to relative form
///
/// Absolute names (`www.example.com`, `example.com.`) have the domain
/// suffix stripped; the apex becomes `@`.
pub fn to_relative_host(host: &str, domain: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();

    if host.is_empty() || host == "@" || host == domain {
        return "@".to_string();
    }

    match host.strip_suffix(&format!(".{domain}")) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => host,
    }
}

/// Translate a relative host to a fully-qualified name (no trailing dot)
pub fn to_absolute_host(host: &str, domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    let relative = to_relative_host(host, &domain);
    if relative == "@" {
        domain
    } else {
        format!("{relative}.{domain}")
    }
}

/// Normalize a user-supplied domain name (`Example.COM.` -> `example.com`)
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Whether a normalized domain is a plain DNS name
///
/// At least two labels of letters, digits, `-` and `_`; no label may start
/// or end with `-`. Anything else (slashes, spaces, empty labels) is
/// rejected before it can reach a provider URL.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// DNS provider selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Registrar with a full-replace host list API
    #[serde(rename = "registrarA")]
    RegistrarA,
    /// Registrar with per-record PUT semantics
    #[serde(rename = "registrarB")]
    RegistrarB,
    /// Zone-based provider with additive record creation
    #[serde(rename = "cloudflareLike")]
    CloudflareLike,
}

impl ProviderKind {
    /// All supported providers
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::RegistrarA,
        ProviderKind::RegistrarB,
        ProviderKind::CloudflareLike,
    ];

    /// Wire identifier (`registrarA`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::RegistrarA => "registrarA",
            ProviderKind::RegistrarB => "registrarB",
            ProviderKind::CloudflareLike => "cloudflareLike",
        }
    }

    /// Human-readable name used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::RegistrarA => "Registrar A",
            ProviderKind::RegistrarB => "Registrar B",
            ProviderKind::CloudflareLike => "Cloudflare",
        }
    }

    /// Parse a wire identifier (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planned record whose (host, type) slot is already taken with another value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// The existing record, host normalized to relative form
    pub record: DnsRecord,
    /// Human-readable explanation
    pub reason: String,
}

/// Result of a dry run; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    /// Provider that was queried
    pub provider: ProviderKind,
    /// Normalized domain
    pub domain: String,
    /// Domain registration used (created during dry run if none was given)
    pub domain_id: String,
    /// Records read from the provider
    pub existing_records: Vec<DnsRecord>,
    /// Advisory value conflicts
    pub conflicts: Vec<Conflict>,
    /// Records apply would write
    pub planned_changes: Vec<DnsRecord>,
    /// Warnings for the user
    pub warnings: Vec<String>,
}

/// Whether a change creates a new record or replaces an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
}

/// Outcome of one planned record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Applied,
    Failed,
}

/// One entry per planned record, accumulated during apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub action: ChangeAction,
    pub record: DnsRecord,
    pub status: ChangeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChangeLogEntry {
    /// Entry for a record that was written
    pub fn applied(action: ChangeAction, record: DnsRecord) -> Self {
        Self {
            action,
            record,
            status: ChangeStatus::Applied,
            error: None,
        }
    }

    /// Entry for a record that could not be written
    pub fn failed(action: ChangeAction, record: DnsRecord, error: impl Into<String>) -> Self {
        Self {
            action,
            record,
            status: ChangeStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Whether the record was written
    pub fn is_applied(&self) -> bool {
        self.status == ChangeStatus::Applied
    }
}

/// Outcome of a best-effort rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackStatus {
    Success,
    Failed,
    /// The snapshot was empty; resubmitting it would wipe the zone
    Skipped,
}

/// Result of an apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub domain: String,
    pub provider: ProviderKind,
    pub txt_status: ChangeStatus,
    pub a_status: ChangeStatus,
    pub change_log: Vec<ChangeLogEntry>,
    pub snapshot_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackStatus>,
    /// True when the idempotent short-circuit answered without provider calls
    #[serde(default)]
    pub cached: bool,
}

/// Provider DNS state captured immediately before the first mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSnapshot {
    pub id: String,
    pub provider: ProviderKind,
    pub records: Vec<DnsRecord>,
    pub taken_at: chrono::DateTime<chrono::Utc>,
}

impl DnsSnapshot {
    /// Capture a new snapshot
    pub fn capture(provider: ProviderKind, records: Vec<DnsRecord>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            records,
            taken_at: chrono::Utc::now(),
        }
    }
}
