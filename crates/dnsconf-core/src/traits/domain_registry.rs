// # Domain Registry Trait
//
// Narrow persistence interface over the customer-domain table.
//
// ## Purpose
//
// The registry holds one row per customer domain: its immutable
// verification token, the point-in-time DNS snapshot used for rollback, and
// the idempotency state (`auto_configured` + `action_fingerprint`).
//
// The orchestrator reads and writes the snapshot, provider, auto-configured
// flag and fingerprint; it never creates or deletes rows except through the
// registration calls made on behalf of the client workflow.
//
// ## Implementations
//
// - `MemoryDomainRegistry`: tests, ephemeral deployments
// - `FileDomainRegistry`: JSON file with atomic writes and backup recovery

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ChangeLogEntry, DnsSnapshot, ProviderKind};

/// Verification status of a customer domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Pending,
    Verifying,
    Verified,
    Failed,
}

/// One customer domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDomainRecord {
    pub id: String,
    pub project_id: String,
    pub domain: String,
    /// Generated once at registration; immutable afterwards
    pub verification_token: String,
    pub status: DomainStatus,
    #[serde(default)]
    pub dns_snapshot: Option<DnsSnapshot>,
    #[serde(default)]
    pub dns_provider: Option<ProviderKind>,
    #[serde(default)]
    pub auto_configured: bool,
    #[serde(default)]
    pub action_fingerprint: Option<String>,
    /// Change log of the successful apply, replayed on the idempotent short-circuit
    #[serde(default)]
    pub last_change_log: Vec<ChangeLogEntry>,
    /// Snapshot taken by the successful apply; `dns_snapshot` may since
    /// belong to a later, failed attempt
    #[serde(default)]
    pub last_snapshot_id: Option<String>,
    /// Fingerprint of the apply currently holding the domain
    #[serde(default)]
    pub apply_claim: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CustomDomainRecord {
    /// Create a freshly registered domain
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        domain: impl Into<String>,
        verification_token: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            domain: domain.into(),
            verification_token: verification_token.into(),
            status: DomainStatus::Pending,
            dns_snapshot: None,
            dns_provider: None,
            auto_configured: false,
            action_fingerprint: None,
            last_change_log: Vec::new(),
            last_snapshot_id: None,
            apply_claim: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The verification token, if one has been issued
    pub fn token(&self) -> Option<&str> {
        let token = self.verification_token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Whether a successful apply with this fingerprint is on record
    pub fn is_applied_with(&self, fingerprint: &str) -> bool {
        self.auto_configured && self.action_fingerprint.as_deref() == Some(fingerprint)
    }

    /// Apply a partial update; `None` fields are left untouched
    pub fn apply_update(&mut self, update: DomainUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(snapshot) = update.dns_snapshot {
            self.dns_snapshot = Some(snapshot);
        }
        if let Some(provider) = update.dns_provider {
            self.dns_provider = Some(provider);
        }
        if let Some(auto_configured) = update.auto_configured {
            self.auto_configured = auto_configured;
        }
        if let Some(fingerprint) = update.action_fingerprint {
            self.action_fingerprint = Some(fingerprint);
        }
        if let Some(change_log) = update.last_change_log {
            self.last_change_log = change_log;
        }
        if let Some(snapshot_id) = update.last_snapshot_id {
            self.last_snapshot_id = Some(snapshot_id);
        }
        self.updated_at = chrono::Utc::now();
    }
}

/// Result of registering a new domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRegistration {
    pub domain_id: String,
    pub verification_token: String,
}

/// Partial update of a domain row
#[derive(Debug, Clone, Default)]
pub struct DomainUpdate {
    pub status: Option<DomainStatus>,
    pub dns_snapshot: Option<DnsSnapshot>,
    pub dns_provider: Option<ProviderKind>,
    pub auto_configured: Option<bool>,
    pub action_fingerprint: Option<String>,
    pub last_change_log: Option<Vec<ChangeLogEntry>>,
    pub last_snapshot_id: Option<String>,
}

/// Outcome of [`DomainRegistry::try_claim_apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyClaim {
    /// The caller now holds the domain and may mutate provider state
    Claimed,
    /// A successful apply with the same fingerprint is already on record
    AlreadyApplied(Box<CustomDomainRecord>),
    /// Another apply holds the domain
    InProgress,
}

/// Persistence interface for customer domains
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage (files, databases, etc.)
/// - ✅ Implement locking/concurrency control for thread safety
///
/// ## Forbidden Capabilities
/// - ❌ Call DNS providers (owned by `ProviderAdapter`)
/// - ❌ Decide when to apply (owned by `Orchestrator`)
#[async_trait]
pub trait DomainRegistry: Send + Sync {
    /// Register a domain for a project and issue its verification token
    async fn create_domain(&self, project_id: &str, domain: &str) -> Result<DomainRegistration>;

    /// Fetch a domain row
    ///
    /// - `Ok(None)`: unknown id
    async fn get_domain(&self, domain_id: &str) -> Result<Option<CustomDomainRecord>>;

    /// Apply a partial update to a domain row
    ///
    /// Fails with [`Error::DomainNotFound`](crate::Error::DomainNotFound)
    /// for unknown ids.
    async fn update_domain(&self, domain_id: &str, update: DomainUpdate) -> Result<()>;

    /// Delete a domain row (no-op if it does not exist)
    async fn remove_domain(&self, domain_id: &str) -> Result<()>;

    /// Atomically claim the domain for an apply
    ///
    /// Must be a single compare-and-set: if the row is already applied with
    /// `fingerprint` return `AlreadyApplied`; else if another claim is held
    /// return `InProgress`; else record the claim and return `Claimed`.
    async fn try_claim_apply(&self, domain_id: &str, fingerprint: &str) -> Result<ApplyClaim>;

    /// Release a claim taken with `fingerprint` (no-op if not held)
    async fn release_apply(&self, domain_id: &str, fingerprint: &str) -> Result<()>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_presence() {
        let record = CustomDomainRecord::new("d1", "p1", "example.com", "abc123");
        assert_eq!(record.token(), Some("abc123"));

        let record = CustomDomainRecord::new("d1", "p1", "example.com", "  ");
        assert_eq!(record.token(), None);
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let mut record = CustomDomainRecord::new("d1", "p1", "example.com", "abc123");
        record.apply_update(DomainUpdate {
            dns_provider: Some(ProviderKind::RegistrarB),
            ..Default::default()
        });

        assert_eq!(record.dns_provider, Some(ProviderKind::RegistrarB));
        assert_eq!(record.verification_token, "abc123");
        assert!(!record.auto_configured);
        assert!(record.dns_snapshot.is_none());

        record.apply_update(DomainUpdate {
            auto_configured: Some(true),
            action_fingerprint: Some("fp".to_string()),
            ..Default::default()
        });
        assert!(record.is_applied_with("fp"));
        assert!(!record.is_applied_with("other"));
    }
}
