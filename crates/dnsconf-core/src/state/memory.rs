// # Memory Domain Registry
//
// In-memory implementation of DomainRegistry.
//
// ## Crash Behavior
//
// - All registrations, snapshots and fingerprints are lost on restart
// - A repeat apply after restart is not short-circuited
//
// ## When to Use
//
// - Tests
// - Ephemeral deployments fronted by an external domain store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{claim_row, new_registration, release_row};
use crate::Error;
use crate::traits::{ApplyClaim, CustomDomainRecord, DomainRegistration, DomainRegistry, DomainUpdate};

/// In-memory domain registry
///
/// Rows live in a HashMap behind a tokio RwLock; the claim compare-and-set
/// runs under the write lock.
///
/// # Example
///
/// ```rust,no_run
/// use dnsconf_core::state::MemoryDomainRegistry;
/// use dnsconf_core::traits::DomainRegistry;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = MemoryDomainRegistry::new();
///
///     let registration = registry.create_domain("project-1", "example.com").await?;
///     let record = registry.get_domain(&registration.domain_id).await?;
///     assert_eq!(record.map(|r| r.verification_token), Some(registration.verification_token));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDomainRegistry {
    inner: Arc<RwLock<HashMap<String, CustomDomainRecord>>>,
}

impl MemoryDomainRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared row, replacing any row with the same id
    pub async fn seed(&self, record: CustomDomainRecord) {
        self.inner.write().await.insert(record.id.clone(), record);
    }

    /// Number of registered domains
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl DomainRegistry for MemoryDomainRegistry {
    async fn create_domain(&self, project_id: &str, domain: &str) -> Result<DomainRegistration, Error> {
        let record = new_registration(project_id, domain)?;
        let registration = DomainRegistration {
            domain_id: record.id.clone(),
            verification_token: record.verification_token.clone(),
        };

        tracing::debug!(
            domain = %record.domain,
            domain_id = %record.id,
            "Registered domain"
        );
        self.inner.write().await.insert(record.id.clone(), record);
        Ok(registration)
    }

    async fn get_domain(&self, domain_id: &str) -> Result<Option<CustomDomainRecord>, Error> {
        Ok(self.inner.read().await.get(domain_id).cloned())
    }

    async fn update_domain(&self, domain_id: &str, update: DomainUpdate) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(domain_id)
            .ok_or_else(|| Error::domain_not_found(domain_id))?;
        record.apply_update(update);
        Ok(())
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<(), Error> {
        self.inner.write().await.remove(domain_id);
        Ok(())
    }

    async fn try_claim_apply(&self, domain_id: &str, fingerprint: &str) -> Result<ApplyClaim, Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(domain_id)
            .ok_or_else(|| Error::domain_not_found(domain_id))?;
        Ok(claim_row(record, fingerprint))
    }

    async fn release_apply(&self, domain_id: &str, fingerprint: &str) -> Result<(), Error> {
        if let Some(record) = self.inner.write().await.get_mut(domain_id) {
            release_row(record, fingerprint);
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
