//! Provider adapter registry
//!
//! Adapters register themselves under their [`ProviderKind`] at startup, so
//! the orchestrator dispatches on the provider id without a hardcoded match.
//!
//! ## Registration
//!
//! Each provider crate exposes a `register` function:
//!
//! ```rust,ignore
//! # use dnsconf_core::{ProviderRegistry, ProviderSettings};
//! // In dnsconf-provider-cloudflare crate
//! pub fn register(registry: &ProviderRegistry, settings: &ProviderSettings) -> Result<()> {
//!     let adapter = CloudflareAdapter::new(&settings.cloudflare_base_url, settings.http_timeout())?;
//!     registry.register_adapter(Arc::new(adapter))
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::traits::ProviderAdapter;
use crate::types::ProviderKind;

/// Registry mapping provider ids to shared adapter instances
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent lookups, exclusive
/// registration.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: RwLock<HashMap<ProviderKind, Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own [`ProviderAdapter::kind`]
    ///
    /// A later registration for the same kind replaces the earlier one.
    pub fn register_adapter(&self, adapter: Arc<dyn ProviderAdapter>) -> Result<()> {
        let kind = adapter.kind();
        let mut adapters = self
            .adapters
            .write()
            .map_err(|_| Error::internal("provider registry lock poisoned"))?;
        if adapters.insert(kind, adapter).is_some() {
            tracing::debug!(provider = %kind, "Replaced registered provider adapter");
        }
        Ok(())
    }

    /// Look up the adapter for a provider
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if nothing is registered for `kind`.
    pub fn adapter(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>> {
        let adapters = self
            .adapters
            .read()
            .map_err(|_| Error::internal("provider registry lock poisoned"))?;
        adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::config(format!("No adapter registered for provider: {}", kind)))
    }

    /// Check if a provider has an adapter
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.adapters
            .read()
            .map(|adapters| adapters.contains_key(&kind))
            .unwrap_or(false)
    }

    /// List registered providers in declaration order
    pub fn list_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.has_provider(*kind))
            .collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list_providers())
            .finish()
    }
}
