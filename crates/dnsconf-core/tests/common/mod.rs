//! Test doubles and common utilities for orchestrator contract tests
//!
//! The mock adapter keeps an in-memory record set and counts every call so
//! tests can assert which provider endpoints were (or were not) hit.

#![allow(dead_code)]

use dnsconf_core::error::{Error, Result};
use dnsconf_core::{
    ChangeAction, ChangeLogEntry, Credentials, DnsConfConfig, DnsRecord, MemoryDomainRegistry,
    Orchestrator, OrchestratorEvent, ProviderAdapter, ProviderKind, ProviderRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// How the mock responds to `apply_records`
#[derive(Debug, Clone, Default)]
pub enum ApplyBehavior {
    /// Every record is written
    #[default]
    Succeed,
    /// Records on these hosts fail, the rest are written
    FailHosts(Vec<String>),
    /// The whole submission fails
    Reject,
}

/// A mock ProviderAdapter that tracks calls
#[derive(Clone)]
pub struct MockAdapter {
    kind: ProviderKind,
    atomic_rollback: bool,
    behavior: ApplyBehavior,
    fail_fetch: bool,
    fail_restore: bool,
    /// Provider-side record set
    records: Arc<Mutex<Vec<DnsRecord>>>,
    fetch_call_count: Arc<AtomicUsize>,
    apply_call_count: Arc<AtomicUsize>,
    restore_call_count: Arc<AtomicUsize>,
    /// Record sets passed to restore_records()
    restored: Arc<Mutex<Vec<Vec<DnsRecord>>>>,
}

impl MockAdapter {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            atomic_rollback: false,
            behavior: ApplyBehavior::Succeed,
            fail_fetch: false,
            fail_restore: false,
            records: Arc::new(Mutex::new(Vec::new())),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            apply_call_count: Arc::new(AtomicUsize::new(0)),
            restore_call_count: Arc::new(AtomicUsize::new(0)),
            restored: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Full-replace style mock with snapshot restore
    pub fn full_replace() -> Self {
        Self::new(ProviderKind::RegistrarA).with_atomic_rollback()
    }

    pub fn with_records(self, records: Vec<DnsRecord>) -> Self {
        *self.records.lock().unwrap() = records;
        self
    }

    pub fn with_atomic_rollback(mut self) -> Self {
        self.atomic_rollback = true;
        self
    }

    pub fn with_behavior(mut self, behavior: ApplyBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_restore(mut self) -> Self {
        self.fail_restore = true;
        self
    }

    /// Create a new MockAdapter that shares counters and records with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        other.clone()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn apply_call_count(&self) -> usize {
        self.apply_call_count.load(Ordering::SeqCst)
    }

    pub fn restore_call_count(&self) -> usize {
        self.restore_call_count.load(Ordering::SeqCst)
    }

    /// Total provider calls of any kind
    pub fn total_calls(&self) -> usize {
        self.fetch_call_count() + self.apply_call_count() + self.restore_call_count()
    }

    pub fn restored(&self) -> Vec<Vec<DnsRecord>> {
        self.restored.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for MockAdapter {
    async fn fetch_records(&self, _domain: &str, _credentials: &Credentials) -> Result<Vec<DnsRecord>> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(Error::provider_auth(self.kind.display_name(), "bad key"));
        }
        Ok(self.records())
    }

    async fn apply_records(
        &self,
        _domain: &str,
        _credentials: &Credentials,
        current: &[DnsRecord],
        planned: &[DnsRecord],
    ) -> Result<Vec<ChangeLogEntry>> {
        self.apply_call_count.fetch_add(1, Ordering::SeqCst);

        let failing = match &self.behavior {
            ApplyBehavior::Reject => {
                return Err(Error::provider_transport(
                    self.kind.display_name(),
                    Some(500),
                    "submission failed",
                ));
            }
            ApplyBehavior::FailHosts(hosts) => hosts.clone(),
            ApplyBehavior::Succeed => Vec::new(),
        };

        let mut stored = self.records.lock().unwrap();
        let mut log = Vec::new();
        for record in planned {
            let action = if current.iter().any(|c| c.same_slot(record)) {
                ChangeAction::Update
            } else {
                ChangeAction::Create
            };

            if failing.contains(&record.host) {
                log.push(ChangeLogEntry::failed(action, record.clone(), "rejected by mock"));
            } else {
                stored.retain(|r| !r.same_slot(record));
                stored.push(record.clone());
                log.push(ChangeLogEntry::applied(action, record.clone()));
            }
        }
        Ok(log)
    }

    fn supports_atomic_rollback(&self) -> bool {
        self.atomic_rollback
    }

    async fn restore_records(&self, _domain: &str, _credentials: &Credentials, snapshot: &[DnsRecord]) -> Result<()> {
        self.restore_call_count.fetch_add(1, Ordering::SeqCst);
        self.restored.lock().unwrap().push(snapshot.to_vec());
        if self.fail_restore {
            return Err(Error::provider_transport(self.kind.display_name(), None, "timed out"));
        }
        *self.records.lock().unwrap() = snapshot.to_vec();
        Ok(())
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

/// Orchestrator wired to a single mock adapter and an in-memory registry
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: MemoryDomainRegistry,
    pub adapter: MockAdapter,
    /// Shared with the orchestrator; register extra adapters here
    pub providers: Arc<ProviderRegistry>,
    pub events: mpsc::Receiver<OrchestratorEvent>,
}

pub fn harness(adapter: MockAdapter) -> Harness {
    let registry = MemoryDomainRegistry::new();
    let providers = Arc::new(ProviderRegistry::new());
    providers
        .register_adapter(Arc::new(MockAdapter::sharing_counters_with(&adapter)))
        .expect("registration succeeds");

    let (orchestrator, events) = Orchestrator::new(
        Arc::new(registry.clone()),
        providers.clone(),
        &test_config(),
    )
    .expect("orchestrator construction succeeds");

    Harness {
        orchestrator: Arc::new(orchestrator),
        registry,
        adapter,
        providers,
        events,
    }
}

pub fn test_config() -> DnsConfConfig {
    let mut config = DnsConfConfig::default();
    config.plan.ingress_ipv4 = INGRESS.parse().unwrap();
    config
}

pub const INGRESS: &str = "203.0.113.10";
pub const PROJECT: &str = "project-1";
pub const DOMAIN: &str = "example.com";

/// Valid credentials for a provider
pub fn credentials(kind: ProviderKind) -> Credentials {
    match kind {
        ProviderKind::RegistrarA => Credentials::RegistrarA {
            api_user: "user".to_string(),
            api_key: "key".to_string(),
        },
        ProviderKind::RegistrarB => Credentials::RegistrarB {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        },
        ProviderKind::CloudflareLike => Credentials::CloudflareLike {
            api_token: "token".to_string(),
        },
    }
}

/// Drain all events emitted so far
pub fn drain(events: &mut mpsc::Receiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
