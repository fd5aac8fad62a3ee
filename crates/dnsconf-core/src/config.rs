//! Configuration types for DNS auto-configuration
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsConfConfig {
    /// Plan builder settings
    #[serde(default)]
    pub plan: PlanConfig,

    /// Provider endpoints and transport settings
    #[serde(default)]
    pub providers: ProviderSettings,

    /// Domain registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl DnsConfConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.plan.validate()?;
        self.providers.validate()?;
        self.registry.validate()?;
        self.orchestrator.validate()?;
        Ok(())
    }
}

/// Plan builder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Platform ingress address the A records point at
    #[serde(default = "default_ingress_ipv4")]
    pub ingress_ipv4: Ipv4Addr,

    /// Namespace prefix of the ownership TXT value (`<namespace>_verify=<token>`)
    #[serde(default = "default_verification_namespace")]
    pub verification_namespace: String,

    /// Relative host of the ownership TXT record
    #[serde(default = "default_verification_host")]
    pub verification_host: String,

    /// TTL for planned records
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,
}

impl PlanConfig {
    /// Validate the plan settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ingress_ipv4.is_unspecified() || self.ingress_ipv4.is_loopback() {
            return Err(crate::Error::config(format!(
                "Ingress address {} cannot be unspecified or loopback",
                self.ingress_ipv4
            )));
        }

        let namespace = self.verification_namespace.trim();
        if namespace.is_empty()
            || !namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::config(format!(
                "Verification namespace '{}' must be non-empty and alphanumeric",
                self.verification_namespace
            )));
        }

        let host = self.verification_host.trim();
        if host.is_empty() || host == "@" || host.contains('.') {
            return Err(crate::Error::config(format!(
                "Verification host '{}' must be a single relative label",
                self.verification_host
            )));
        }

        if self.record_ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }

        Ok(())
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            ingress_ipv4: default_ingress_ipv4(),
            verification_namespace: default_verification_namespace(),
            verification_host: default_verification_host(),
            record_ttl: default_record_ttl(),
        }
    }
}

/// Provider endpoints
///
/// Base URLs are configurable so that staging/sandbox endpoints and mock
/// servers can be used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Full-replace registrar API base URL
    #[serde(default = "default_registrar_a_base_url")]
    pub registrar_a_base_url: String,

    /// Per-record registrar API base URL
    #[serde(default = "default_registrar_b_base_url")]
    pub registrar_b_base_url: String,

    /// Zone-based provider API base URL
    #[serde(default = "default_cloudflare_base_url")]
    pub cloudflare_base_url: String,

    /// HTTP timeout per request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl ProviderSettings {
    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, url) in [
            ("registrar A", &self.registrar_a_base_url),
            ("registrar B", &self.registrar_b_base_url),
            ("cloudflare", &self.cloudflare_base_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "The {name} base URL must use HTTP or HTTPS. Got: {url}"
                )));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }

        Ok(())
    }

    /// Per-request timeout
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            registrar_a_base_url: default_registrar_a_base_url(),
            registrar_b_base_url: default_registrar_b_base_url(),
            cloudflare_base_url: default_cloudflare_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Domain registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// File-based registry
    File {
        /// Path to the registry file
        path: String,
    },

    /// In-memory registry (not persistent)
    #[default]
    Memory,
}

impl RegistryConfig {
    /// Validate the registry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RegistryConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("Registry file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Capacity of the orchestrator event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl OrchestratorConfig {
    /// Validate the orchestrator settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ingress_ipv4() -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, 1)
}

fn default_verification_namespace() -> String {
    "sitebuilder".to_string()
}

fn default_verification_host() -> String {
    "_verify".to_string()
}

fn default_record_ttl() -> u32 {
    3600
}

fn default_registrar_a_base_url() -> String {
    "https://api.registrar-a.com/v1".to_string()
}

fn default_registrar_b_base_url() -> String {
    "https://api.registrar-b.com".to_string()
}

fn default_cloudflare_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    256
}
