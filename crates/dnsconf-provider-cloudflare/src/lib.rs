// # Cloudflare DNS Adapter
//
// Zone-based provider: every call first resolves the zone id for the
// domain, then works on the zone's record collection.
//
// ## Semantics
//
// - `fetch_records` follows pagination until the last page; names are
//   translated to relative form (`www.example.com` -> `www`)
// - `apply_records` creates each planned record with its own POST; an
//   outcome is recorded per record
// - A planned record already present in the zone with the same value is
//   not sent again, so a retry after a partial failure only creates what
//   is missing
// - Records are always created, never updated in place: a conflicting
//   record already in the zone stays until the user removes it
// - Zone lookup failure aborts before any mutating call
// - No atomic rollback
//
// ## Security Requirements
//
// - API token NEVER appears in logs or error messages
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dnsconf_core::types::{to_absolute_host, to_relative_host};
use dnsconf_core::{
    ChangeAction, ChangeLogEntry, Credentials, DnsRecord, Error, ProviderAdapter, ProviderKind,
    ProviderRegistry, ProviderSettings, RecordType, Result,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const KIND: ProviderKind = ProviderKind::CloudflareLike;

/// Records requested per page
const PAGE_SIZE: u32 = 100;

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ZoneRecord {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    priority: Option<u16>,
}

#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u16>,
}

/// Cloudflare-like DNS adapter
///
/// Holds no credentials; the bearer token arrives with each call.
#[derive(Debug)]
pub struct CloudflareAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl CloudflareAdapter {
    /// Create an adapter against `base_url` (e.g. `https://api.cloudflare.com/client/v4`)
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

    /// ⚠️ NEVER log the returned value
    fn token(credentials: &Credentials) -> Result<&str> {
        match credentials {
            Credentials::CloudflareLike { api_token } => Ok(api_token),
            other => Err(Credentials::mismatch(KIND, other)),
        }
    }

    /// Send a request and unwrap the v4 envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<Envelope<T>> {
        let response = request
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider_transport(KIND.display_name(), None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::from_http_status(KIND.display_name(), status.as_u16(), error_text));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider_transport(
                KIND.display_name(),
                Some(status.as_u16()),
                format!("Failed to parse response: {}", e),
            )
        })?;

        if !envelope.success {
            let detail = envelope
                .errors
                .iter()
                .map(|m| format!("{} ({})", m.message, m.code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::provider_transport(
                KIND.display_name(),
                Some(status.as_u16()),
                detail,
            ));
        }

        Ok(envelope)
    }

    /// Resolve the zone id for a domain
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self, domain: &str, token: &str) -> Result<String> {
        tracing::debug!(domain = %domain, "Looking up zone");

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", domain)]);
        let envelope: Envelope<Vec<Zone>> = self.send(request, token).await?;

        let zone = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::provider_not_found(
                    KIND.display_name(),
                    format!(
                        "no zone named {} in this account. Add the domain to your account first",
                        domain
                    ),
                )
            })?;

        tracing::debug!(domain = %domain, zone_id = %zone.id, "Found zone");
        Ok(zone.id)
    }

    async fn create_record(
        &self,
        zone_id: &str,
        domain: &str,
        token: &str,
        record: &DnsRecord,
    ) -> Result<()> {
        let body = NewRecord {
            record_type: record.record_type.as_str(),
            name: to_absolute_host(&record.host, domain),
            content: &record.value,
            // 1 means "automatic"
            ttl: record.ttl.unwrap_or(1),
            proxied: false,
            priority: record.priority,
        };

        let request = self
            .client
            .post(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
            .json(&body);
        self.send::<serde_json::Value>(request, token).await.map(|_| ())
    }
}

#[async_trait]
impl ProviderAdapter for CloudflareAdapter {
    async fn fetch_records(&self, domain: &str, credentials: &Credentials) -> Result<Vec<DnsRecord>> {
        let token = Self::token(credentials)?;
        let zone_id = self.zone_id(domain, token).await?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let request = self
                .client
                .get(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let envelope: Envelope<Vec<ZoneRecord>> = self.send(request, token).await?;

            records.extend(envelope.result.unwrap_or_default().into_iter().map(|r| DnsRecord {
                record_type: RecordType::from(r.record_type),
                host: to_relative_host(&r.name, domain),
                value: r.content,
                ttl: r.ttl,
                priority: r.priority,
            }));

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }

        tracing::debug!(domain = %domain, count = records.len(), "Fetched zone records");
        Ok(records)
    }

    async fn apply_records(
        &self,
        domain: &str,
        credentials: &Credentials,
        current: &[DnsRecord],
        planned: &[DnsRecord],
    ) -> Result<Vec<ChangeLogEntry>> {
        let token = Self::token(credentials)?;
        let zone_id = self.zone_id(domain, token).await?;

        let mut log = Vec::with_capacity(planned.len());
        for record in planned {
            if current.iter().any(|existing| existing.same_record(record)) {
                tracing::debug!(
                    domain = %domain,
                    host = %record.host,
                    record_type = %record.record_type,
                    "Record already present"
                );
                log.push(ChangeLogEntry::applied(ChangeAction::Create, record.clone()));
                continue;
            }

            match self.create_record(&zone_id, domain, token, record).await {
                Ok(()) => {
                    tracing::debug!(
                        domain = %domain,
                        host = %record.host,
                        record_type = %record.record_type,
                        "Record created"
                    );
                    log.push(ChangeLogEntry::applied(ChangeAction::Create, record.clone()));
                }
                Err(e) => {
                    tracing::warn!(
                        domain = %domain,
                        host = %record.host,
                        record_type = %record.record_type,
                        "Record creation failed: {}",
                        e
                    );
                    log.push(ChangeLogEntry::failed(ChangeAction::Create, record.clone(), e.to_string()));
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
///
/// # Example
///
/// ```rust
/// use dnsconf_core::{ProviderKind, ProviderRegistry, ProviderSettings};
///
/// let registry = ProviderRegistry::new();
/// dnsconf_provider_cloudflare::register(&registry, &ProviderSettings::default()).unwrap();
/// assert!(registry.has_provider(ProviderKind::CloudflareLike));
/// ```
pub fn register(registry: &ProviderRegistry, settings: &ProviderSettings) -> Result<()> {
    let adapter = CloudflareAdapter::new(&settings.cloudflare_base_url, settings.http_timeout())?;
    registry.register_adapter(Arc::new(adapter))
}
