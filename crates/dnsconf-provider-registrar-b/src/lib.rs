// # Registrar B Adapter (per-record PUT)
//
// Adapter for registrars that address records by (type, name) and replace
// each slot with its own PUT.
//
// ## Semantics
//
// - `fetch_records` lists every record of the domain
// - `apply_records` issues one PUT per planned record and collects an
//   independent outcome per call; a failed PUT does not stop the others
// - No atomicity, so no snapshot restore: `supports_atomic_rollback` is false
//
// ## API Reference
//
// - List records: GET `/v1/domains/{domain}/records`
// - Replace slot: PUT `/v1/domains/{domain}/records/{type}/{name}` with
//   `[{"data": ..., "ttl": ...}]`
// - Auth header: `Authorization: sso-key {key}:{secret}`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dnsconf_core::{
    ChangeAction, ChangeLogEntry, Credentials, DnsRecord, Error, ProviderAdapter, ProviderKind,
    ProviderRegistry, ProviderSettings, RecordType, Result, types::to_relative_host,
};
use serde::{Deserialize, Serialize};

const KIND: ProviderKind = ProviderKind::RegistrarB;

#[derive(Debug, Deserialize)]
struct RecordEntry {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    priority: Option<u16>,
}

#[derive(Debug, Serialize)]
struct RecordValue<'a> {
    data: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u16>,
}

/// Per-record registrar adapter
#[derive(Debug)]
pub struct RegistrarBAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl RegistrarBAdapter {
    /// Create an adapter against `base_url` (e.g. `https://api.registrar-b.com`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `sso-key` authorization header value
    ///
    /// ⚠️ Contains the secret; never log it.
    fn authorization(credentials: &Credentials) -> Result<String> {
        match credentials {
            Credentials::RegistrarB { api_key, api_secret } => Ok(format!("sso-key {}:{}", api_key, api_secret)),
            other => Err(Credentials::mismatch(KIND, other)),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(Error::from_http_status(KIND.display_name(), status.as_u16(), body))
    }

    /// Write one record slot
    async fn put_record(&self, domain: &str, authorization: &str, record: &DnsRecord) -> Result<()> {
        let url = format!(
            "{}/v1/domains/{}/records/{}/{}",
            self.base_url, domain, record.record_type, record.host
        );
        let body = [RecordValue {
            data: &record.value,
            ttl: record.ttl,
            priority: record.priority,
        }];

        let response = self
            .client
            .put(&url)
            .header("Authorization", authorization)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provider_transport(KIND.display_name(), None, e.to_string()))?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl ProviderAdapter for RegistrarBAdapter {
    async fn fetch_records(&self, domain: &str, credentials: &Credentials) -> Result<Vec<DnsRecord>> {
        let authorization = Self::authorization(credentials)?;
        tracing::debug!(domain = %domain, "Listing records");

        let response = self
            .client
            .get(format!("{}/v1/domains/{}/records", self.base_url, domain))
            .header("Authorization", &authorization)
            .send()
            .await
            .map_err(|e| Error::provider_transport(KIND.display_name(), None, e.to_string()))?;
        let response = Self::check(response).await?;

        let entries: Vec<RecordEntry> = response.json().await.map_err(|e| {
            Error::provider_transport(
                KIND.display_name(),
                None,
                format!("Failed to parse response: {}", e),
            )
        })?;

        Ok(entries
            .into_iter()
            .map(|entry| DnsRecord {
                record_type: RecordType::from(entry.record_type),
                host: to_relative_host(&entry.name, domain),
                value: entry.data,
                ttl: entry.ttl,
                priority: entry.priority,
            })
            .collect())
    }

    async fn apply_records(
        &self,
        domain: &str,
        credentials: &Credentials,
        current: &[DnsRecord],
        planned: &[DnsRecord],
    ) -> Result<Vec<ChangeLogEntry>> {
        let authorization = Self::authorization(credentials)?;

        let mut log = Vec::with_capacity(planned.len());
        for record in planned {
            let action = if current.iter().any(|c| c.same_slot(record)) {
                ChangeAction::Update
            } else {
                ChangeAction::Create
            };

            match self.put_record(domain, &authorization, record).await {
                Ok(()) => {
                    tracing::debug!(
                        domain = %domain,
                        host = %record.host,
                        record_type = %record.record_type,
                        "Record written"
                    );
                    log.push(ChangeLogEntry::applied(action, record.clone()));
                }
                Err(e) => {
                    tracing::warn!(
                        domain = %domain,
                        host = %record.host,
                        record_type = %record.record_type,
                        "Record write failed: {}",
                        e
                    );
                    log.push(ChangeLogEntry::failed(action, record.clone(), e.to_string()));
                }
            }
        }

        Ok(log)
    }

    fn kind(&self) -> ProviderKind {
        KIND
    }
}

/// Register the adapter with a provider registry
pub fn register(registry: &ProviderRegistry, settings: &ProviderSettings) -> Result<()> {
    let adapter = RegistrarBAdapter::new(&settings.registrar_b_base_url, settings.http_timeout())?;
    registry.register_adapter(Arc::new(adapter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnsconf_core::ChangeStatus;
    use httpmock::prelude::*;
    use serde_json::json;

    const DOMAIN: &str = "example.com";
    const AUTH: &str = "sso-key key-1:secret-1";

    fn creds() -> Credentials {
        Credentials::RegistrarB {
            api_key: "key-1".to_string(),
            api_secret: "secret-1".to_string(),
        }
    }

    fn adapter(server: &MockServer) -> RegistrarBAdapter {
        RegistrarBAdapter::new(server.base_url(), Duration::from_secs(5)).unwrap()
    }

    fn planned() -> Vec<DnsRecord> {
        vec![
            DnsRecord::new(RecordType::A, "@", "5.6.7.8").with_ttl(3600),
            DnsRecord::new(RecordType::A, "www", "5.6.7.8").with_ttl(3600),
            DnsRecord::new(RecordType::Txt, "_verify", "sitebuilder_verify=abc123").with_ttl(3600),
        ]
    }

    #[tokio::test]
    async fn test_fetch_records() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/domains/example.com/records")
                    .header("Authorization", AUTH);
                then.status(200).json_body(json!([
                    {"type": "A", "name": "@", "data": "1.2.3.4", "ttl": 600},
                    {"type": "MX", "name": "@", "data": "mail.example.com", "ttl": 3600, "priority": 10},
                    {"type": "TXT", "name": "_dmarc", "data": "v=DMARC1; p=none"}
                ]));
            })
            .await;

        let records = adapter(&server).fetch_records(DOMAIN, &creds()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], DnsRecord::new(RecordType::A, "@", "1.2.3.4").with_ttl(600));
        assert_eq!(records[1].priority, Some(10));
        assert_eq!(records[2].host, "_dmarc");
    }

    #[tokio::test]
    async fn test_fetch_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/example.com/records");
                then.status(401).json_body(json!({"code": "UNABLE_TO_AUTHENTICATE"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/example.org/records");
                then.status(404).json_body(json!({"code": "NOT_FOUND"}));
            })
            .await;

        let adapter = adapter(&server);
        assert!(matches!(
            adapter.fetch_records(DOMAIN, &creds()).await,
            Err(Error::ProviderAuth { .. })
        ));
        assert!(matches!(
            adapter.fetch_records("example.org", &creds()).await,
            Err(Error::ProviderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_one_put_per_record() {
        let server = MockServer::start_async().await;
        let apex = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v1/domains/example.com/records/A/@")
                    .header("Authorization", AUTH)
                    .json_body(json!([{"data": "5.6.7.8", "ttl": 3600}]));
                then.status(200);
            })
            .await;
        let www = server
            .mock_async(|when, then| {
                when.method(PUT).path("/v1/domains/example.com/records/A/www");
                then.status(200);
            })
            .await;
        let txt = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v1/domains/example.com/records/TXT/_verify")
                    .json_body(json!([{"data": "sitebuilder_verify=abc123", "ttl": 3600}]));
                then.status(200);
            })
            .await;

        let current = vec![DnsRecord::new(RecordType::A, "@", "1.2.3.4")];
        let log = adapter(&server)
            .apply_records(DOMAIN, &creds(), &current, &planned())
            .await
            .unwrap();

        apex.assert_hits_async(1).await;
        www.assert_hits_async(1).await;
        txt.assert_hits_async(1).await;
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(ChangeLogEntry::is_applied));
        assert_eq!(log[0].action, ChangeAction::Update);
        assert_eq!(log[1].action, ChangeAction::Create);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/v1/domains/example.com/records/A/@");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/v1/domains/example.com/records/A/www");
                then.status(422).json_body(json!({"code": "INVALID_BODY", "message": "bad data"}));
            })
            .await;
        let txt = server
            .mock_async(|when, then| {
                when.method(PUT).path("/v1/domains/example.com/records/TXT/_verify");
                then.status(200);
            })
            .await;

        let log = adapter(&server)
            .apply_records(DOMAIN, &creds(), &[], &planned())
            .await
            .unwrap();

        txt.assert_hits_async(1).await;
        let statuses: Vec<ChangeStatus> = log.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![ChangeStatus::Applied, ChangeStatus::Failed, ChangeStatus::Applied]
        );
        let error = log[1].error.as_deref().unwrap();
        assert!(error.contains("422"));
        assert!(!error.contains("secret-1"));
    }

    #[test]
    fn test_no_atomic_rollback() {
        let adapter = RegistrarBAdapter::new("http://localhost", Duration::from_secs(1)).unwrap();
        assert!(!adapter.supports_atomic_rollback());
        assert_eq!(adapter.kind(), ProviderKind::RegistrarB);
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry, &ProviderSettings::default()).unwrap();
        assert!(registry.has_provider(ProviderKind::RegistrarB));
    }
}
