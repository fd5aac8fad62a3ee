// # Domain Registry Implementations
//
// This module provides implementations of the DomainRegistry trait for
// different persistence strategies. Both share the row-level claim logic
// below so the compare-and-set semantics cannot drift between them.

pub mod file;
pub mod memory;

pub use file::FileDomainRegistry;
pub use memory::MemoryDomainRegistry;

use crate::error::{Error, Result};
use crate::traits::{ApplyClaim, CustomDomainRecord};
use crate::types::{is_valid_domain, normalize_domain};

/// Build a fresh row with a newly issued verification token
fn new_registration(project_id: &str, domain: &str) -> Result<CustomDomainRecord> {
    let project_id = project_id.trim();
    if project_id.is_empty() {
        return Err(Error::invalid_input("Project id cannot be empty"));
    }

    let domain = normalize_domain(domain);
    if !is_valid_domain(&domain) {
        return Err(Error::invalid_input(format!("Invalid domain name: '{}'", domain)));
    }

    Ok(CustomDomainRecord::new(
        uuid::Uuid::new_v4().to_string(),
        project_id,
        domain,
        uuid::Uuid::new_v4().simple().to_string(),
    ))
}

/// Compare-and-set on one row; caller holds the write lock
fn claim_row(record: &mut CustomDomainRecord, fingerprint: &str) -> ApplyClaim {
    if record.is_applied_with(fingerprint) {
        return ApplyClaim::AlreadyApplied(Box::new(record.clone()));
    }
    if record.apply_claim.is_some() {
        return ApplyClaim::InProgress;
    }
    record.apply_claim = Some(fingerprint.to_string());
    record.updated_at = chrono::Utc::now();
    ApplyClaim::Claimed
}

/// Drop a claim if `fingerprint` holds it; returns whether anything changed
fn release_row(record: &mut CustomDomainRecord, fingerprint: &str) -> bool {
    if record.apply_claim.as_deref() == Some(fingerprint) {
        record.apply_claim = None;
        record.updated_at = chrono::Utc::now();
        true
    } else {
        false
    }
}
