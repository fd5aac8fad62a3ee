// # Registrar A Adapter (full replace)
//
// Adapter for registrars whose API exposes the host list of a domain as a
// single document: reading returns every record, writing replaces every
// record.
//
// ## Semantics
//
// - `fetch_records` returns the complete host list
// - `apply_records` merges the planned records into the fetched list
//   (same host + type: value replaced; otherwise appended) and submits the
//   whole merged list in ONE call
// - `restore_records` resubmits a snapshot through the same call, which is
//   what makes rollback possible; `supports_atomic_rollback` is true
//
// ## Trust Level: Untrusted (Provider Adapter)
//
// - ✅ HTTP calls to the configured base URL only
// - ❌ No retries (caller decision)
// - ❌ No credential caching; credentials arrive with each call
//
// ## API Reference
//
// - List hosts: GET `/domains/{domain}/hosts`
// - Replace hosts: POST `/domains/{domain}/hosts` with `{"hosts": [...]}`
// - Auth headers: `X-Api-User`, `X-Api-Key`
// - Body-level failures: `{"success": false, "errors": [{"code", "message"}]}`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dnsconf_core::{
    ChangeAction, ChangeLogEntry, Credentials, DnsRecord, Error, ProviderAdapter, ProviderKind,
    ProviderRegistry, ProviderSettings, RecordType, Result, types::to_relative_host,
};
use serde::{Deserialize, Serialize};

const KIND: ProviderKind = ProviderKind::RegistrarA;

/// One entry of the registrar host list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostEntry {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mx_pref: Option<u16>,
}

impl HostEntry {
    fn from_record(record: &DnsRecord) -> Self {
        Self {
            name: record.host.clone(),
            record_type: record.record_type.to_string(),
            address: record.value.clone(),
            ttl: record.ttl,
            mx_pref: record.priority,
        }
    }

    fn into_record(self, domain: &str) -> DnsRecord {
        DnsRecord {
            record_type: RecordType::from(self.record_type),
            host: to_relative_host(&self.name, domain),
            value: self.address,
            ttl: self.ttl,
            priority: self.mx_pref,
        }
    }
}

#[derive(Debug, Serialize)]
struct HostListRequest<'a> {
    hosts: &'a [HostEntry],
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    hosts: Vec<HostEntry>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn default_success() -> bool {
    true
}

/// Full-replace registrar adapter
///
/// # Security
///
/// Holds no credentials. The Debug output shows the endpoint only.
#[derive(Debug)]
pub struct RegistrarAAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl RegistrarAAdapter {
    /// Create an adapter against `base_url` (e.g. `https://api.registrar-a.com/v1`)
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

    fn hosts_url(&self, domain: &str) -> String {
        format!("{}/domains/{}/hosts", self.base_url, domain)
    }

    fn auth<'a>(credentials: &'a Credentials) -> Result<(&'a str, &'a str)> {
        match credentials {
            Credentials::RegistrarA { api_user, api_key } => Ok((api_user, api_key)),
            other => Err(Credentials::mismatch(KIND, other)),
        }
    }

    /// Send a request and decode the envelope, mapping HTTP and body-level
    /// failures onto the provider error taxonomy
    async fn send(&self, request: reqwest::RequestBuilder, domain: &str) -> Result<Envelope> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::provider_transport(KIND.display_name(), None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::from_http_status(KIND.display_name(), status.as_u16(), body));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            Error::provider_transport(
                KIND.display_name(),
                Some(status.as_u16()),
                format!("Failed to parse response: {}", e),
            )
        })?;

        if envelope.success {
            return Ok(envelope);
        }

        let error = envelope.errors.into_iter().next().unwrap_or(ApiError {
            code: String::new(),
            message: "request rejected without details".to_string(),
        });
        Err(match error.code.as_str() {
            "AUTH_FAILED" | "INVALID_API_KEY" => Error::provider_auth(KIND.display_name(), error.message),
            "DOMAIN_NOT_FOUND" => Error::provider_not_found(
                KIND.display_name(),
                format!("{} is not registered in this account: {}", domain, error.message),
            ),
            _ => Error::provider_transport(
                KIND.display_name(),
                Some(status.as_u16()),
                format!("{}: {}", error.code, error.message),
            ),
        })
    }

    async fn submit(&self, domain: &str, credentials: &Credentials, hosts: &[HostEntry]) -> Result<()> {
        let (api_user, api_key) = Self::auth(credentials)?;
        let request = self
            .client
            .post(self.hosts_url(domain))
            .header("X-Api-User", api_user)
            .header("X-Api-Key", api_key)
            .json(&HostListRequest { hosts });
        self.send(request, domain).await.map(|_| ())
    }
}

/// Merge planned records into the current host list
///
/// A planned record replaces every current record in its (host, type) slot;
/// otherwise it is appended. Returns the list to submit and the action taken
/// for each planned record, in plan order.
fn merge_hosts(current: &[DnsRecord], planned: &[DnsRecord]) -> (Vec<DnsRecord>, Vec<ChangeAction>) {
    let mut merged = current.to_vec();
    let mut actions = Vec::with_capacity(planned.len());

    for record in planned {
        match merged.iter().position(|r| r.same_slot(record)) {
            Some(index) => {
                merged[index] = record.clone();
                let mut position = 0;
                merged.retain(|r| {
                    let keep = position == index || !r.same_slot(record);
                    position += 1;
                    keep
                });
                actions.push(ChangeAction::Update);
            }
            None => {
                merged.push(record.clone());
                actions.push(ChangeAction::Create);
            }
        }
    }

    (merged, actions)
}

#[async_trait]
impl ProviderAdapter for RegistrarAAdapter {
    async fn fetch_records(&self, domain: &str, credentials: &Credentials) -> Result<Vec<DnsRecord>> {
        let (api_user, api_key) = Self::auth(credentials)?;
        tracing::debug!(domain = %domain, "Fetching host list");

        let request = self
            .client
            .get(self.hosts_url(domain))
            .header("X-Api-User", api_user)
            .header("X-Api-Key", api_key);
        let envelope = self.send(request, domain).await?;

        Ok(envelope
            .hosts
            .into_iter()
            .map(|host| host.into_record(domain))
            .collect())
    }

    async fn apply_records(
        &self,
        domain: &str,
        credentials: &Credentials,
        current: &[DnsRecord],
        planned: &[DnsRecord],
    ) -> Result<Vec<ChangeLogEntry>> {
        let (merged, actions) = merge_hosts(current, planned);
        let hosts: Vec<HostEntry> = merged.iter().map(HostEntry::from_record).collect();

        tracing::info!(
            domain = %domain,
            hosts = hosts.len(),
            planned = planned.len(),
            "Submitting merged host list"
        );
        self.submit(domain, credentials, &hosts).await?;

        Ok(actions
            .into_iter()
            .zip(planned)
            .map(|(action, record)| ChangeLogEntry::applied(action, record.clone()))
            .collect())
    }

    fn supports_atomic_rollback(&self) -> bool {
        true
    }

    async fn restore_records(&self, domain: &str, credentials: &Credentials, snapshot: &[DnsRecord]) -> Result<()> {
        let hosts: Vec<HostEntry> = snapshot.iter().map(HostEntry::from_record).collect();
        tracing::info!(domain = %domain, hosts = hosts.len(), "Resubmitting snapshot host list");
        self.submit(domain, credentials, &hosts).await
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
/// dnsconf_provider_registrar_a::register(&registry, &ProviderSettings::default()).unwrap();
/// assert!(registry.has_provider(ProviderKind::RegistrarA));
/// ```
pub fn register(registry: &ProviderRegistry, settings: &ProviderSettings) -> Result<()> {
    let adapter = RegistrarAAdapter::new(&settings.registrar_a_base_url, settings.http_timeout())?;
    registry.register_adapter(Arc::new(adapter))
}
