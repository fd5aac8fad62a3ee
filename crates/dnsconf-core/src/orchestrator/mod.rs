//! DNS configuration orchestrator
//!
//! The Orchestrator is responsible for:
//! - Dry run: read current records, build the plan, report conflicts
//! - Apply: guarded mutation with idempotency, snapshot and rollback
//! - Releasing abandoned registrations
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────┐
//!  ConfigureRequest ───▶ │ Orchestrator │ ─── OrchestratorEvent ───▶ monitoring
//!                        └──────────────┘
//!                               │
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//! ┌────────────────┐   ┌─────────────────┐   ┌─────────────────┐
//! │ DomainRegistry │   │ plan / conflicts│   │ ProviderAdapter │
//! │ (claim, snap)  │   │ (pure)          │   │ (fetch, apply)  │
//! └────────────────┘   └─────────────────┘   └─────────────────┘
//! ```
//!
//! ## Apply Flow
//!
//! 1. Load the domain row and check it belongs to the project
//! 2. Compute the fingerprint; a recorded success short-circuits
//! 3. Atomically claim the domain in the registry
//! 4. Fetch current records and persist them as the snapshot
//! 5. Hand current + planned records to the adapter
//! 6. Roll back through the adapter when it supports atomic restore
//! 7. On full success record `auto_configured` and the fingerprint
//! 8. Release the claim

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{DnsConfConfig, PlanConfig};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::plan::{action_fingerprint, build_plan, detect_conflicts, plan_warnings};
use crate::registry::ProviderRegistry;
use crate::traits::{ApplyClaim, CustomDomainRecord, DomainRegistry, DomainUpdate, ProviderAdapter};
use crate::types::{
    ApplyResult, ChangeAction, ChangeLogEntry, ChangeStatus, DnsRecord, DnsSnapshot, DryRunResult,
    ProviderKind, RecordType, RollbackStatus, is_valid_domain, normalize_domain,
};

/// Events emitted by the Orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// Dry run finished
    DryRunCompleted {
        domain: String,
        provider: ProviderKind,
        conflicts: usize,
        planned: usize,
    },

    /// Apply claimed the domain and is about to talk to the provider
    ApplyStarted {
        domain: String,
        provider: ProviderKind,
    },

    /// Apply answered from the recorded success
    ApplySkipped {
        domain: String,
        provider: ProviderKind,
    },

    /// Pre-change snapshot persisted
    SnapshotStored {
        domain: String,
        snapshot_id: String,
        records: usize,
    },

    /// Rollback attempted after a failed apply
    RollbackAttempted {
        domain: String,
        status: RollbackStatus,
    },

    /// Apply ran to completion (successfully or not)
    ApplyFinished {
        domain: String,
        provider: ProviderKind,
        success: bool,
    },
}

/// One `ConfigureDns` call
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    pub dry_run: bool,
    pub project_id: String,
    pub domain: String,
    pub provider: ProviderKind,
    pub credentials: Credentials,
    pub domain_id: Option<String>,
}

/// Response of a `ConfigureDns` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigureOutcome {
    DryRun(DryRunResult),
    Apply(ApplyResult),
}

/// DNS configuration orchestrator
///
/// Stateless between calls apart from the domain registry; one instance
/// serves all requests. Each call runs its provider calls sequentially.
pub struct Orchestrator {
    /// Persistence for domains, snapshots and idempotency state
    registry: Arc<dyn DomainRegistry>,

    /// Adapters by provider id
    providers: Arc<ProviderRegistry>,

    /// Plan builder settings
    plan: PlanConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<OrchestratorEvent>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver)
    pub fn new(
        registry: Arc<dyn DomainRegistry>,
        providers: Arc<ProviderRegistry>,
        config: &DnsConfConfig,
    ) -> Result<(Self, mpsc::Receiver<OrchestratorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.orchestrator.event_channel_capacity);

        let orchestrator = Self {
            registry,
            providers,
            plan: config.plan.clone(),
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Entry point for `ConfigureDns`
    pub async fn configure_dns(&self, request: ConfigureRequest) -> Result<ConfigureOutcome> {
        if request.dry_run {
            self.dry_run(
                &request.project_id,
                &request.domain,
                request.provider,
                &request.credentials,
                request.domain_id.as_deref(),
            )
            .await
            .map(ConfigureOutcome::DryRun)
        } else {
            let domain_id = request
                .domain_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| Error::invalid_input("domainId is required to apply changes"))?;
            self.apply(
                &request.project_id,
                &request.domain,
                request.provider,
                &request.credentials,
                domain_id,
            )
            .await
            .map(ConfigureOutcome::Apply)
        }
    }

    /// Read-only preview of what apply would change
    ///
    /// Without `domain_id` the domain is registered first to obtain a
    /// verification token; a registration failure aborts before any
    /// provider call. Never writes to the provider.
    pub async fn dry_run(
        &self,
        project_id: &str,
        domain: &str,
        provider: ProviderKind,
        credentials: &Credentials,
        domain_id: Option<&str>,
    ) -> Result<DryRunResult> {
        let domain = Self::checked_domain(domain)?;
        let adapter = self.adapter_for(provider, credentials)?;

        let (domain_id, token, registered_here) = match domain_id {
            Some(id) => {
                let record = self.owned_domain(project_id, &domain, id).await?;
                (record.id.clone(), record.token().map(str::to_string), false)
            }
            None => {
                let registration = self.registry.create_domain(project_id, &domain).await?;
                info!(
                    domain = %domain,
                    domain_id = %registration.domain_id,
                    "Registered domain for dry run"
                );
                (registration.domain_id, Some(registration.verification_token), true)
            }
        };

        let existing = match adapter.fetch_records(&domain, credentials).await {
            Ok(records) => records,
            Err(e) => {
                warn!(domain = %domain, provider = %provider, "Dry run fetch failed: {}", e);
                if registered_here {
                    // The caller never learns the id, so the row would dangle
                    if let Err(remove_err) = self.registry.remove_domain(&domain_id).await {
                        warn!(domain_id = %domain_id, "Failed to remove registration: {}", remove_err);
                    }
                }
                return Err(e);
            }
        };

        let planned = build_plan(&self.plan, token.as_deref());
        let conflicts = detect_conflicts(&existing, &planned, &domain);
        let warnings = plan_warnings(&existing, &planned, &domain, &conflicts);

        info!(
            domain = %domain,
            provider = %provider,
            existing = existing.len(),
            conflicts = conflicts.len(),
            planned = planned.len(),
            "Dry run completed"
        );
        self.emit_event(OrchestratorEvent::DryRunCompleted {
            domain: domain.clone(),
            provider,
            conflicts: conflicts.len(),
            planned: planned.len(),
        });

        Ok(DryRunResult {
            provider,
            domain,
            domain_id,
            existing_records: existing,
            conflicts,
            planned_changes: planned,
            warnings,
        })
    }

    /// Write the plan to the provider
    ///
    /// A repeat of a successful apply with the same (domain, token, provider)
    /// returns the recorded result with `cached = true` and makes no
    /// provider calls.
    pub async fn apply(
        &self,
        project_id: &str,
        domain: &str,
        provider: ProviderKind,
        credentials: &Credentials,
        domain_id: &str,
    ) -> Result<ApplyResult> {
        let domain = Self::checked_domain(domain)?;
        let record = self.owned_domain(project_id, &domain, domain_id).await?;
        let token = record
            .token()
            .ok_or_else(|| {
                Error::plan_validation(format!(
                    "Domain {} has no verification token; register it before applying",
                    domain
                ))
            })?
            .to_string();

        let fingerprint = action_fingerprint(&domain, &token, provider);
        if record.is_applied_with(&fingerprint) {
            return Ok(self.cached_result(&record, provider));
        }

        let adapter = self.adapter_for(provider, credentials)?;

        match self.registry.try_claim_apply(domain_id, &fingerprint).await? {
            ApplyClaim::Claimed => {}
            ApplyClaim::AlreadyApplied(record) => return Ok(self.cached_result(&record, provider)),
            ApplyClaim::InProgress => {
                warn!(domain = %domain, domain_id = %domain_id, "Apply rejected: another apply holds the domain");
                return Err(Error::ApplyInProgress(domain));
            }
        }

        let result = self
            .apply_claimed(adapter.as_ref(), &domain, domain_id, credentials, &token, &fingerprint)
            .await;

        if let Err(e) = self.registry.release_apply(domain_id, &fingerprint).await {
            warn!(domain_id = %domain_id, "Failed to release apply claim: {}", e);
        }

        self.emit_event(OrchestratorEvent::ApplyFinished {
            domain: domain.clone(),
            provider,
            success: result.as_ref().is_ok_and(|r| r.success),
        });
        result
    }

    /// Remove a registration abandoned before apply
    ///
    /// Returns `false` without touching anything when the domain is unknown,
    /// already auto-configured, or held by an in-flight apply.
    pub async fn release_domain(&self, project_id: &str, domain_id: &str) -> Result<bool> {
        let Some(record) = self.registry.get_domain(domain_id).await? else {
            return Ok(false);
        };
        if record.project_id != project_id {
            return Err(Error::domain_not_found(domain_id));
        }
        if record.auto_configured {
            debug!(domain_id = %domain_id, "Keeping auto-configured domain");
            return Ok(false);
        }

        // Holding a claim keeps a concurrent apply out while the row goes away
        const RELEASE_CLAIM: &str = "release";
        match self.registry.try_claim_apply(domain_id, RELEASE_CLAIM).await? {
            ApplyClaim::Claimed => {}
            ApplyClaim::AlreadyApplied(_) | ApplyClaim::InProgress => return Ok(false),
        }

        let still_unconfigured = self
            .registry
            .get_domain(domain_id)
            .await?
            .is_some_and(|r| !r.auto_configured);
        if !still_unconfigured {
            self.registry.release_apply(domain_id, RELEASE_CLAIM).await?;
            return Ok(false);
        }

        self.registry.remove_domain(domain_id).await?;
        info!(domain = %record.domain, domain_id = %domain_id, "Released domain registration");
        Ok(true)
    }

    /// Apply body; runs while the claim is held
    async fn apply_claimed(
        &self,
        adapter: &dyn ProviderAdapter,
        domain: &str,
        domain_id: &str,
        credentials: &Credentials,
        token: &str,
        fingerprint: &str,
    ) -> Result<ApplyResult> {
        let provider = adapter.kind();
        self.emit_event(OrchestratorEvent::ApplyStarted {
            domain: domain.to_string(),
            provider,
        });

        // Re-read under the claim: a finished concurrent apply may have
        // changed the snapshot
        let record = self
            .registry
            .get_domain(domain_id)
            .await?
            .ok_or_else(|| Error::domain_not_found(domain_id))?;

        let current = adapter.fetch_records(domain, credentials).await?;
        let snapshot = self.store_snapshot(&record, provider, &current).await?;

        let planned = build_plan(&self.plan, Some(token));
        info!(
            domain = %domain,
            provider = %provider,
            current = current.len(),
            planned = planned.len(),
            "Applying DNS plan"
        );

        let (change_log, submit_failed) =
            match adapter.apply_records(domain, credentials, &current, &planned).await {
                Ok(log) => (Self::complete_log(log, &planned, &current), false),
                Err(e) if adapter.supports_atomic_rollback() => {
                    error!(domain = %domain, provider = %provider, "Record submission failed: {}", e);
                    let message = e.user_message();
                    let log: Vec<ChangeLogEntry> = planned
                        .iter()
                        .map(|r| ChangeLogEntry::failed(Self::action_for(&current, r), r.clone(), message.clone()))
                        .collect();
                    (log, true)
                }
                Err(e) => {
                    error!(domain = %domain, provider = %provider, "Apply failed before any write: {}", e);
                    return Err(e);
                }
            };

        let success = !submit_failed && change_log.iter().all(ChangeLogEntry::is_applied);

        let rollback = if !success && adapter.supports_atomic_rollback() {
            Some(self.rollback(adapter, domain, credentials, &snapshot).await)
        } else {
            if !success {
                warn!(
                    domain = %domain,
                    provider = %provider,
                    failed = change_log.iter().filter(|e| !e.is_applied()).count(),
                    "Partial apply; provider has no atomic rollback"
                );
            }
            None
        };

        if success {
            let update = DomainUpdate {
                auto_configured: Some(true),
                action_fingerprint: Some(fingerprint.to_string()),
                last_change_log: Some(change_log.clone()),
                last_snapshot_id: Some(snapshot.id.clone()),
                ..Default::default()
            };
            if let Err(e) = self.registry.update_domain(domain_id, update).await {
                error!(
                    domain = %domain,
                    domain_id = %domain_id,
                    "Records applied but idempotency state could not be stored: {}",
                    e
                );
            }
        }

        info!(domain = %domain, provider = %provider, success, "Apply finished");

        Ok(ApplyResult {
            domain: domain.to_string(),
            provider,
            txt_status: Self::txt_status(&change_log),
            a_status: Self::apex_a_status(&change_log),
            change_log,
            snapshot_id: Some(snapshot.id),
            success,
            rollback,
            cached: false,
        })
    }

    /// Persist the pre-change snapshot, keeping one left by an unfinished
    /// apply against the same provider
    async fn store_snapshot(
        &self,
        record: &CustomDomainRecord,
        provider: ProviderKind,
        current: &[DnsRecord],
    ) -> Result<DnsSnapshot> {
        if let Some(existing) = &record.dns_snapshot {
            if !record.auto_configured && existing.provider == provider {
                debug!(
                    domain = %record.domain,
                    snapshot_id = %existing.id,
                    "Keeping snapshot from an unfinished apply"
                );
                return Ok(existing.clone());
            }
        }

        let snapshot = DnsSnapshot::capture(provider, current.to_vec());
        self.registry
            .update_domain(
                &record.id,
                DomainUpdate {
                    dns_snapshot: Some(snapshot.clone()),
                    dns_provider: Some(provider),
                    ..Default::default()
                },
            )
            .await?;

        self.emit_event(OrchestratorEvent::SnapshotStored {
            domain: record.domain.clone(),
            snapshot_id: snapshot.id.clone(),
            records: snapshot.records.len(),
        });
        Ok(snapshot)
    }

    /// Resubmit the snapshot; never fails the apply itself
    async fn rollback(
        &self,
        adapter: &dyn ProviderAdapter,
        domain: &str,
        credentials: &Credentials,
        snapshot: &DnsSnapshot,
    ) -> RollbackStatus {
        let status = if snapshot.records.is_empty() {
            warn!(domain = %domain, "Snapshot is empty; skipping rollback");
            RollbackStatus::Skipped
        } else {
            match adapter.restore_records(domain, credentials, &snapshot.records).await {
                Ok(()) => {
                    info!(domain = %domain, snapshot_id = %snapshot.id, "Rolled back to snapshot");
                    RollbackStatus::Success
                }
                Err(e) => {
                    error!(domain = %domain, snapshot_id = %snapshot.id, "Rollback failed: {}", e);
                    RollbackStatus::Failed
                }
            }
        };

        self.emit_event(OrchestratorEvent::RollbackAttempted {
            domain: domain.to_string(),
            status,
        });
        status
    }

    /// Result replayed from the recorded success
    fn cached_result(&self, record: &CustomDomainRecord, provider: ProviderKind) -> ApplyResult {
        info!(domain = %record.domain, provider = %provider, "Apply already done; returning recorded result");
        self.emit_event(OrchestratorEvent::ApplySkipped {
            domain: record.domain.clone(),
            provider,
        });

        ApplyResult {
            domain: record.domain.clone(),
            provider,
            txt_status: Self::txt_status(&record.last_change_log),
            a_status: Self::apex_a_status(&record.last_change_log),
            change_log: record.last_change_log.clone(),
            snapshot_id: record.last_snapshot_id.clone(),
            success: true,
            rollback: None,
            cached: true,
        }
    }

    /// Make sure every planned record has an outcome
    fn complete_log(
        mut log: Vec<ChangeLogEntry>,
        planned: &[DnsRecord],
        current: &[DnsRecord],
    ) -> Vec<ChangeLogEntry> {
        for record in planned {
            if !log.iter().any(|entry| entry.record.same_slot(record)) {
                log.push(ChangeLogEntry::failed(
                    Self::action_for(current, record),
                    record.clone(),
                    "Provider reported no outcome for this record",
                ));
            }
        }
        log
    }

    fn action_for(current: &[DnsRecord], record: &DnsRecord) -> ChangeAction {
        if current.iter().any(|c| c.same_slot(record)) {
            ChangeAction::Update
        } else {
            ChangeAction::Create
        }
    }

    fn txt_status(log: &[ChangeLogEntry]) -> ChangeStatus {
        log.iter()
            .find(|e| e.record.record_type == RecordType::Txt)
            .map(|e| e.status)
            .unwrap_or(ChangeStatus::Pending)
    }

    fn apex_a_status(log: &[ChangeLogEntry]) -> ChangeStatus {
        log.iter()
            .find(|e| e.record.record_type == RecordType::A && e.record.host == "@")
            .map(|e| e.status)
            .unwrap_or(ChangeStatus::Pending)
    }

    /// Load a domain row and check ownership
    async fn owned_domain(&self, project_id: &str, domain: &str, domain_id: &str) -> Result<CustomDomainRecord> {
        match self.registry.get_domain(domain_id).await? {
            Some(record) if record.project_id == project_id && record.domain == domain => Ok(record),
            Some(_) => {
                warn!(domain_id = %domain_id, "Domain does not belong to the requesting project");
                Err(Error::domain_not_found(domain_id))
            }
            None => Err(Error::domain_not_found(domain_id)),
        }
    }

    fn adapter_for(&self, provider: ProviderKind, credentials: &Credentials) -> Result<Arc<dyn ProviderAdapter>> {
        if credentials.provider() != provider {
            return Err(Credentials::mismatch(provider, credentials));
        }
        self.providers.adapter(provider)
    }

    fn checked_domain(domain: &str) -> Result<String> {
        let domain = normalize_domain(domain);
        if !is_valid_domain(&domain) {
            return Err(Error::invalid_input(format!("Invalid domain name: '{}'", domain)));
        }
        Ok(domain)
    }

    /// Emit an orchestrator event
    fn emit_event(&self, event: OrchestratorEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.providers)
            .field("plan", &self.plan)
            .finish()
    }
}
