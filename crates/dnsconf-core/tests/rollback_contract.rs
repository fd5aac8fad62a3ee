//! Contract Test: Snapshot and Rollback
//!
//! Constraints verified:
//! - The snapshot is stored before the first mutating call
//! - A failed full-replace submission triggers exactly one rollback that
//!   resubmits the snapshot verbatim
//! - Rollback status is reported (success, failed, skipped)
//! - Providers without atomic rollback are never asked to restore
//! - A retry after a failed apply keeps the original snapshot
//! - Every started apply reports a finish, including ones that end in an error

mod common;

use common::*;
use dnsconf_core::traits::{CustomDomainRecord, DomainRegistry};
use dnsconf_core::{ChangeStatus, DnsRecord, OrchestratorEvent, ProviderKind, RecordType, RollbackStatus};

fn existing() -> Vec<DnsRecord> {
    vec![
        DnsRecord::new(RecordType::A, "@", "1.2.3.4").with_ttl(600),
        DnsRecord::new(RecordType::Mx, "@", "mail.example.com").with_priority(10),
        DnsRecord::new(RecordType::Other("ALIAS".to_string()), "shop", "shops.example.net"),
    ]
}

async fn seeded(adapter: MockAdapter) -> Harness {
    let h = harness(adapter);
    h.registry
        .seed(CustomDomainRecord::new("d1", PROJECT, DOMAIN, "abc123"))
        .await;
    h
}

async fn apply(h: &Harness, kind: ProviderKind) -> dnsconf_core::ApplyResult {
    h.orchestrator
        .apply(PROJECT, DOMAIN, kind, &credentials(kind), "d1")
        .await
        .expect("apply returns a result")
}

#[tokio::test]
async fn rejected_submission_rolls_back_to_snapshot() {
    let adapter = MockAdapter::full_replace()
        .with_records(existing())
        .with_behavior(ApplyBehavior::Reject);
    let mut h = seeded(adapter).await;

    let result = apply(&h, ProviderKind::RegistrarA).await;

    assert!(!result.success);
    assert_eq!(result.rollback, Some(RollbackStatus::Success));
    assert_eq!(result.change_log.len(), 3);
    assert!(result.change_log.iter().all(|e| e.status == ChangeStatus::Failed));
    assert_eq!(result.a_status, ChangeStatus::Failed);
    assert_eq!(result.txt_status, ChangeStatus::Failed);

    assert_eq!(h.adapter.restore_call_count(), 1);
    assert_eq!(h.adapter.restored(), vec![existing()], "snapshot resubmitted verbatim");

    let record = h.registry.get_domain("d1").await.unwrap().unwrap();
    let snapshot = record.dns_snapshot.expect("snapshot stored");
    assert_eq!(snapshot.records, existing());
    assert_eq!(result.snapshot_id, Some(snapshot.id));
    assert!(!record.auto_configured);

    let events = drain(&mut h.events);
    let snapshot_at = events
        .iter()
        .position(|e| matches!(e, OrchestratorEvent::SnapshotStored { records: 3, .. }))
        .expect("snapshot event");
    let rollback_at = events
        .iter()
        .position(|e| {
            matches!(
                e,
                OrchestratorEvent::RollbackAttempted {
                    status: RollbackStatus::Success,
                    ..
                }
            )
        })
        .expect("rollback event");
    assert!(snapshot_at < rollback_at);
    assert!(matches!(
        events.last(),
        Some(OrchestratorEvent::ApplyFinished { success: false, .. })
    ));
}

#[tokio::test]
async fn failed_restore_is_reported() {
    let adapter = MockAdapter::full_replace()
        .with_records(existing())
        .with_behavior(ApplyBehavior::Reject)
        .failing_restore();
    let h = seeded(adapter).await;

    let result = apply(&h, ProviderKind::RegistrarA).await;

    assert!(!result.success);
    assert_eq!(result.rollback, Some(RollbackStatus::Failed));
    assert_eq!(h.adapter.restore_call_count(), 1);
}

#[tokio::test]
async fn empty_snapshot_skips_rollback() {
    let adapter = MockAdapter::full_replace().with_behavior(ApplyBehavior::Reject);
    let h = seeded(adapter).await;

    let result = apply(&h, ProviderKind::RegistrarA).await;

    assert_eq!(result.rollback, Some(RollbackStatus::Skipped));
    assert_eq!(h.adapter.restore_call_count(), 0);
}

#[tokio::test]
async fn partial_failure_on_full_replace_rolls_back() {
    let adapter = MockAdapter::full_replace()
        .with_records(existing())
        .with_behavior(ApplyBehavior::FailHosts(vec!["_verify".to_string()]));
    let h = seeded(adapter).await;

    let result = apply(&h, ProviderKind::RegistrarA).await;

    assert!(!result.success);
    assert_eq!(result.a_status, ChangeStatus::Applied);
    assert_eq!(result.txt_status, ChangeStatus::Failed);
    assert_eq!(result.rollback, Some(RollbackStatus::Success));
    assert_eq!(h.adapter.records(), existing(), "provider state restored");
}

#[tokio::test]
async fn per_record_provider_is_never_restored() {
    let adapter = MockAdapter::new(ProviderKind::RegistrarB)
        .with_records(existing())
        .with_behavior(ApplyBehavior::FailHosts(vec!["www".to_string()]));
    let h = seeded(adapter).await;

    let result = apply(&h, ProviderKind::RegistrarB).await;

    assert!(!result.success);
    assert_eq!(result.rollback, None);
    assert_eq!(h.adapter.restore_call_count(), 0);
}

#[tokio::test]
async fn rejected_submission_without_rollback_support_is_an_error() {
    let adapter = MockAdapter::new(ProviderKind::CloudflareLike)
        .with_records(existing())
        .with_behavior(ApplyBehavior::Reject);
    let mut h = seeded(adapter).await;

    let err = h
        .orchestrator
        .apply(
            PROJECT,
            DOMAIN,
            ProviderKind::CloudflareLike,
            &credentials(ProviderKind::CloudflareLike),
            "d1",
        )
        .await
        .unwrap_err();

    assert!(err.is_provider_error());
    assert_eq!(h.adapter.restore_call_count(), 0);

    let record = h.registry.get_domain("d1").await.unwrap().unwrap();
    assert!(record.apply_claim.is_none(), "claim released on error");

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(e, OrchestratorEvent::ApplyStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(OrchestratorEvent::ApplyFinished { success: false, .. })
    ));
}

#[tokio::test]
async fn retry_keeps_original_snapshot() {
    // Per-record provider: the first attempt leaves @ written, www failed
    let adapter = MockAdapter::new(ProviderKind::RegistrarB)
        .with_records(existing())
        .with_behavior(ApplyBehavior::FailHosts(vec!["www".to_string()]));
    let h = seeded(adapter).await;

    let first = apply(&h, ProviderKind::RegistrarB).await;
    let second = apply(&h, ProviderKind::RegistrarB).await;

    assert_eq!(first.snapshot_id, second.snapshot_id);
    let record = h.registry.get_domain("d1").await.unwrap().unwrap();
    assert_eq!(record.dns_snapshot.unwrap().records, existing());
}
