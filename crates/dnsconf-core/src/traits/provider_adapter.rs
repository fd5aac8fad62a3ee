// # Provider Adapter Trait
//
// Defines the interface every DNS/registrar API client implements.
//
// ## Implementations
//
// - Full-replace registrar: `dnsconf-provider-registrar-a` crate
// - Per-record PUT registrar: `dnsconf-provider-registrar-b` crate
// - Zone-based CREATE provider: `dnsconf-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsconf_core::{Credentials, ProviderAdapter};
//
// let adapter = /* ProviderAdapter implementation */;
// let creds = Credentials::CloudflareLike { api_token: token };
//
// let current = adapter.fetch_records("example.com", &creds).await?;
// let log = adapter.apply_records("example.com", &creds, &current, &planned).await?;
// ```

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::types::{ChangeLogEntry, DnsRecord, ProviderKind};

/// Capability interface for one DNS provider API
///
/// Adapters are stateless with respect to callers: credentials arrive with
/// every call and must not be cached. One adapter instance is shared by all
/// requests.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Translate hosts between relative form and the provider's addressing
/// - ✅ Return typed failures (auth, not found, transport)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (retry is a caller decision)
/// - ❌ Access the domain registry (owned by `Orchestrator`)
/// - ❌ Decide idempotency (owned by `Orchestrator`; additive providers would
///   otherwise duplicate records)
/// - ❌ Log or persist credentials
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Read the current record set for a domain
    ///
    /// Hosts in the returned records are relative (`@`, `www`, ...).
    ///
    /// # Errors
    ///
    /// - [`Error::ProviderAuth`]: bad credentials
    /// - [`Error::ProviderNotFound`]: domain/zone unknown to this account
    /// - [`Error::ProviderTransport`]: network/HTTP failure with status + body
    async fn fetch_records(&self, domain: &str, credentials: &Credentials)
    -> Result<Vec<DnsRecord>>;

    /// Write every planned record
    ///
    /// `current` is the record set read (and snapshotted) immediately before
    /// this call. Full-replace providers merge into it; per-record providers
    /// use it to label each entry `create` or `update`.
    ///
    /// Per-record providers must return one [`ChangeLogEntry`] per planned
    /// record even when some writes fail. An `Err` means nothing can be said
    /// about individual records: the request failed as a whole (for
    /// full-replace providers, the single submission failed).
    async fn apply_records(
        &self,
        domain: &str,
        credentials: &Credentials,
        current: &[DnsRecord],
        planned: &[DnsRecord],
    ) -> Result<Vec<ChangeLogEntry>>;

    /// Whether resubmitting a snapshot restores the pre-change state
    ///
    /// Only providers that replace the whole record set atomically can make
    /// this promise.
    fn supports_atomic_rollback(&self) -> bool {
        false
    }

    /// Resubmit a snapshot verbatim
    ///
    /// Only called when [`supports_atomic_rollback`](Self::supports_atomic_rollback)
    /// returns `true`.
    async fn restore_records(
        &self,
        _domain: &str,
        _credentials: &Credentials,
        _snapshot: &[DnsRecord],
    ) -> Result<()> {
        Err(Error::internal(format!(
            "{} does not support snapshot rollback",
            self.kind().display_name()
        )))
    }

    /// Which provider this adapter talks to
    fn kind(&self) -> ProviderKind;
}
