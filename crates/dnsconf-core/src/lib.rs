// # dnsconf-core
//
// Core library for DNS auto-configuration of customer domains.
//
// ## Architecture Overview
//
// - **ProviderAdapter**: Trait for reading and writing records through one
//   registrar/DNS provider API
// - **DomainRegistry**: Trait for persisting domains, snapshots and
//   idempotency state
// - **plan**: Pure plan builder, conflict detector and fingerprint
// - **Orchestrator**: Dry run and guarded apply over the pieces above
// - **ConfigurationWorkflow**: Form → Preview → Applying → Result
// - **ProviderRegistry**: Adapters registered by provider id
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Provider protocols live in their own crates
// 2. **Plugin-Based**: Adapters are registered at startup, no if-else over names
// 3. **Read Before Write**: Dry run never mutates; apply snapshots first
// 4. **Idempotency**: A successful apply is recorded and never repeated
// 5. **Explicit Credentials**: Passed into every call, never stored

pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod registry;
pub mod state;
pub mod traits;
pub mod types;
pub mod workflow;

// Re-export core types for convenience
pub use config::{DnsConfConfig, OrchestratorConfig, PlanConfig, ProviderSettings, RegistryConfig};
pub use credentials::{CredentialBundle, Credentials};
pub use error::{Error, Result};
pub use orchestrator::{ConfigureOutcome, ConfigureRequest, Orchestrator, OrchestratorEvent};
pub use registry::ProviderRegistry;
pub use state::{FileDomainRegistry, MemoryDomainRegistry};
pub use traits::{DomainRegistry, ProviderAdapter};
pub use types::{
    ApplyResult, ChangeAction, ChangeLogEntry, ChangeStatus, Conflict, DnsRecord, DnsSnapshot,
    DryRunResult, ProviderKind, RecordType, RollbackStatus,
};
pub use workflow::{ConfigurationWorkflow, DomainForm, WorkflowStage};
