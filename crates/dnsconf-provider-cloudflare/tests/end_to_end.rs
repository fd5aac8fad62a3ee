//! End-to-end: dry run then apply against a mocked zone API
//!
//! Wires the real adapter into the orchestrator over an in-memory domain
//! registry and checks that a repeated apply is answered from the
//! recorded result without touching the provider, and that a retry after
//! a partial failure creates only the missing records.

use std::sync::Arc;

use dnsconf_core::traits::CustomDomainRecord;
use dnsconf_core::{
    ApplyResult, ChangeStatus, ConfigureOutcome, ConfigureRequest, Credentials, DnsConfConfig,
    MemoryDomainRegistry, Orchestrator, ProviderKind, ProviderRegistry, RecordType,
};
use httpmock::Mock;
use httpmock::prelude::*;
use serde_json::json;

const PROJECT: &str = "project-1";
const DOMAIN: &str = "example.com";
const DOMAIN_ID: &str = "domain-1";

fn request(dry_run: bool) -> ConfigureRequest {
    ConfigureRequest {
        dry_run,
        project_id: PROJECT.to_string(),
        domain: DOMAIN.to_string(),
        provider: ProviderKind::CloudflareLike,
        credentials: Credentials::CloudflareLike {
            api_token: "token-1".to_string(),
        },
        domain_id: Some(DOMAIN_ID.to_string()),
    }
}

fn apply_result(outcome: ConfigureOutcome) -> ApplyResult {
    match outcome {
        ConfigureOutcome::Apply(result) => result,
        other => panic!("expected apply, got {other:?}"),
    }
}

async fn mock_zone(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/zones").query_param("name", DOMAIN);
            then.status(200).json_body(json!({
                "success": true,
                "result": [{"id": "zone-1", "name": DOMAIN}]
            }));
        })
        .await;
}

async fn mock_create<'a>(server: &'a MockServer, name: &str, status: u16) -> Mock<'a> {
    let needle = format!("\"name\":\"{}\"", name);
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/zones/zone-1/dns_records")
                .body_contains(needle);
            if status == 200 {
                then.status(200).json_body(json!({"success": true, "result": {"id": "new"}}));
            } else {
                then.status(status).body("upstream error");
            }
        })
        .await
}

fn wire_orchestrator(server: &MockServer, registry: &MemoryDomainRegistry) -> (Orchestrator, DnsConfConfig) {
    let mut config = DnsConfConfig::default();
    config.providers.cloudflare_base_url = server.base_url();

    let providers = ProviderRegistry::new();
    dnsconf_provider_cloudflare::register(&providers, &config.providers).unwrap();

    let (orchestrator, _events) =
        Orchestrator::new(Arc::new(registry.clone()), Arc::new(providers), &config).unwrap();
    (orchestrator, config)
}

#[tokio::test]
async fn retry_after_partial_failure_creates_only_missing_records() {
    let server = MockServer::start_async().await;
    mock_zone(&server).await;
    let mut empty_zone = server
        .mock_async(|when, then| {
            when.method(GET).path("/zones/zone-1/dns_records");
            then.status(200).json_body(json!({
                "success": true,
                "result": [],
                "result_info": {"page": 1, "per_page": 100, "total_pages": 1}
            }));
        })
        .await;
    let apex = mock_create(&server, DOMAIN, 200).await;
    let txt = mock_create(&server, "_verify.example.com", 200).await;
    let mut www_down = mock_create(&server, "www.example.com", 500).await;

    let registry = MemoryDomainRegistry::new();
    registry
        .seed(CustomDomainRecord::new(DOMAIN_ID, PROJECT, DOMAIN, "abc123"))
        .await;
    let (orchestrator, config) = wire_orchestrator(&server, &registry);

    let first = apply_result(orchestrator.configure_dns(request(false)).await.unwrap());
    assert!(!first.success);
    assert_eq!(first.a_status, ChangeStatus::Applied);
    assert_eq!(first.txt_status, ChangeStatus::Applied);
    assert_eq!(first.rollback, None);
    apex.assert_hits_async(1).await;
    txt.assert_hits_async(1).await;
    www_down.assert_hits_async(1).await;

    // The zone now holds what the first attempt created; www recovers
    empty_zone.delete_async().await;
    www_down.delete_async().await;
    let ingress = config.plan.ingress_ipv4.to_string();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/zones/zone-1/dns_records");
            then.status(200).json_body(json!({
                "success": true,
                "result": [
                    {"id": "r1", "type": "A", "name": DOMAIN, "content": ingress, "ttl": 1},
                    {"id": "r2", "type": "TXT", "name": "_verify.example.com", "content": "\"sitebuilder_verify=abc123\"", "ttl": 1}
                ],
                "result_info": {"page": 1, "per_page": 100, "total_pages": 1}
            }));
        })
        .await;
    let www = mock_create(&server, "www.example.com", 200).await;

    let retry = apply_result(orchestrator.configure_dns(request(false)).await.unwrap());
    assert!(retry.success);
    assert!(!retry.cached);
    assert_eq!(retry.snapshot_id, first.snapshot_id);
    apex.assert_hits_async(1).await;
    txt.assert_hits_async(1).await;
    www.assert_hits_async(1).await;

    let repeat = apply_result(orchestrator.configure_dns(request(false)).await.unwrap());
    assert!(repeat.cached);
    assert_eq!(repeat.change_log, retry.change_log);
    www.assert_hits_async(1).await;
}

#[tokio::test]
async fn dry_run_apply_and_cached_repeat() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/zones").query_param("name", DOMAIN);
            then.status(200).json_body(json!({
                "success": true,
                "result": [{"id": "zone-1", "name": DOMAIN}]
            }));
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/zones/zone-1/dns_records");
            then.status(200).json_body(json!({
                "success": true,
                "result": [],
                "result_info": {"page": 1, "per_page": 100, "total_pages": 1}
            }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/zones/zone-1/dns_records");
            then.status(200).json_body(json!({"success": true, "result": {"id": "new"}}));
        })
        .await;

    let mut config = DnsConfConfig::default();
    config.providers.cloudflare_base_url = server.base_url();

    let providers = ProviderRegistry::new();
    dnsconf_provider_cloudflare::register(&providers, &config.providers).unwrap();

    let registry = MemoryDomainRegistry::new();
    registry
        .seed(CustomDomainRecord::new(DOMAIN_ID, PROJECT, DOMAIN, "abc123"))
        .await;

    let (orchestrator, _events) =
        Orchestrator::new(Arc::new(registry.clone()), Arc::new(providers), &config).unwrap();

    // Dry run: empty zone, three planned records, nothing written
    let preview = match orchestrator.configure_dns(request(true)).await.unwrap() {
        ConfigureOutcome::DryRun(result) => result,
        other => panic!("expected dry run, got {other:?}"),
    };
    assert!(preview.conflicts.is_empty());
    assert_eq!(preview.planned_changes.len(), 3);
    assert!(preview
        .planned_changes
        .iter()
        .any(|r| r.record_type == RecordType::Txt && r.value == "sitebuilder_verify=abc123"));
    create.assert_hits_async(0).await;

    // Apply
    let applied = match orchestrator.configure_dns(request(false)).await.unwrap() {
        ConfigureOutcome::Apply(result) => result,
        other => panic!("expected apply, got {other:?}"),
    };
    assert!(applied.success);
    assert!(!applied.cached);
    assert_eq!(applied.a_status, ChangeStatus::Applied);
    assert_eq!(applied.txt_status, ChangeStatus::Applied);
    assert!(applied.snapshot_id.is_some());
    create.assert_hits_async(3).await;

    // Repeat: answered from the registry
    let list_hits = list.hits_async().await;
    let repeat = match orchestrator.configure_dns(request(false)).await.unwrap() {
        ConfigureOutcome::Apply(result) => result,
        other => panic!("expected apply, got {other:?}"),
    };
    assert!(repeat.cached);
    assert!(repeat.success);
    assert_eq!(repeat.change_log, applied.change_log);
    create.assert_hits_async(3).await;
    assert_eq!(list.hits_async().await, list_hits);
}
