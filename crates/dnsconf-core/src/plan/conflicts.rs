// Conflict detection between fetched and planned records.
//
// Conflicts are advisory: they are shown in the dry run preview and never
// stop an apply, since planned records supersede conflicting ones.

use crate::types::{Conflict, DnsRecord, RecordType, to_relative_host};

/// Flag existing records that share (host, type) with a planned record but
/// carry a different value
///
/// Existing hosts are normalized to relative form first, so adapters that
/// return absolute names compare correctly.
pub fn detect_conflicts(existing: &[DnsRecord], planned: &[DnsRecord], domain: &str) -> Vec<Conflict> {
    let normalized: Vec<DnsRecord> = existing
        .iter()
        .map(|record| DnsRecord {
            host: to_relative_host(&record.host, domain),
            ..record.clone()
        })
        .collect();

    let mut conflicts = Vec::new();
    for wanted in planned {
        let wanted_host = to_relative_host(&wanted.host, domain);
        for current in normalized
            .iter()
            .filter(|r| r.record_type == wanted.record_type && r.host == wanted_host)
        {
            if !current.same_value(wanted) {
                conflicts.push(Conflict {
                    reason: format!(
                        "{} record for {} currently points to {}; it will be replaced with {}",
                        current.record_type, current.host, current.value, wanted.value
                    ),
                    record: current.clone(),
                });
            }
        }
    }

    conflicts
}

/// Warnings that are not value conflicts
///
/// - a CNAME on a host that will get an A record (the two cannot coexist)
/// - the ownership TXT record is missing from the plan
pub fn plan_warnings(
    existing: &[DnsRecord],
    planned: &[DnsRecord],
    domain: &str,
    conflicts: &[Conflict],
) -> Vec<String> {
    let mut warnings: Vec<String> = conflicts.iter().map(|c| c.reason.clone()).collect();

    for wanted in planned.iter().filter(|r| r.record_type == RecordType::A) {
        let wanted_host = to_relative_host(&wanted.host, domain);
        for cname in existing.iter().filter(|r| {
            r.record_type == RecordType::Cname && to_relative_host(&r.host, domain) == wanted_host
        }) {
            warnings.push(format!(
                "{} has a CNAME to {}; it must be removed before an A record can be added",
                wanted_host, cname.value
            ));
        }
    }

    if !planned.iter().any(|r| r.record_type == RecordType::Txt) {
        warnings.push(
            "Verification token not available yet; the ownership TXT record is not part of this plan"
                .to_string(),
        );
    }

    warnings
}
