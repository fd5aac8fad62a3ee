//! Core traits for DNS auto-configuration
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ProviderAdapter`]: Read and write DNS records via one provider API
//! - [`DomainRegistry`]: Persistence of customer domains, snapshots and idempotency state

pub mod domain_registry;
pub mod provider_adapter;

pub use domain_registry::{
    ApplyClaim, CustomDomainRecord, DomainRegistration, DomainRegistry, DomainStatus, DomainUpdate,
};
pub use provider_adapter::ProviderAdapter;
