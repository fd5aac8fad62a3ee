//! Plan builder
//!
//! Produces the canonical desired record set for a domain:
//!
//! ```text
//! A    @        <ingress>
//! A    www      <ingress>
//! TXT  _verify  "<namespace>_verify=<token>"   (only when a token exists)
//! ```
//!
//! The same builder feeds dry run and apply so the two stages cannot diverge.

mod conflicts;

pub use conflicts::{detect_conflicts, plan_warnings};

use sha2::{Digest, Sha256};

use crate::config::PlanConfig;
use crate::types::{DnsRecord, ProviderKind, RecordType, normalize_domain};

/// Build the planned record set
///
/// Deterministic and side-effect free. A missing or blank token omits the
/// TXT ownership record.
pub fn build_plan(config: &PlanConfig, verification_token: Option<&str>) -> Vec<DnsRecord> {
    let ingress = config.ingress_ipv4.to_string();
    let mut plan = vec![
        DnsRecord::new(RecordType::A, "@", ingress.clone()).with_ttl(config.record_ttl),
        DnsRecord::new(RecordType::A, "www", ingress).with_ttl(config.record_ttl),
    ];

    if let Some(token) = verification_token.map(str::trim).filter(|t| !t.is_empty()) {
        plan.push(
            DnsRecord::new(
                RecordType::Txt,
                config.verification_host.trim(),
                ownership_value(config, token),
            )
            .with_ttl(config.record_ttl),
        );
    }

    plan
}

/// TXT value proving ownership: `<namespace>_verify=<token>`
pub fn ownership_value(config: &PlanConfig, token: &str) -> String {
    format!("{}_verify={}", config.verification_namespace.trim(), token.trim())
}

/// Idempotency fingerprint of one logical apply intent
///
/// SHA-256 over (domain, token, provider), hex encoded.
pub fn action_fingerprint(domain: &str, verification_token: &str, provider: ProviderKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_domain(domain).as_bytes());
    hasher.update([0u8]);
    hasher.update(verification_token.trim().as_bytes());
    hasher.update([0u8]);
    hasher.update(provider.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
