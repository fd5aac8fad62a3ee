//! Per-call provider credentials
//!
//! Credentials are passed explicitly into every adapter call and are never
//! stored by the orchestrator or the domain registry. The `Debug`
//! implementations redact every secret.

use serde::Deserialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::ProviderKind;

const REDACTED: &str = "<REDACTED>";

/// Raw credential bundle as received from a caller
///
/// Which fields are required depends on the provider; see
/// [`Credentials::from_bundle`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_user: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED);
        f.debug_struct("CredentialBundle")
            .field("api_key", &mask(&self.api_key))
            .field("api_user", &self.api_user)
            .field("api_secret", &mask(&self.api_secret))
            .field("api_token", &mask(&self.api_token))
            .finish()
    }
}

/// Validated, provider-specific credentials
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Full-replace registrar: account user plus API key
    RegistrarA { api_user: String, api_key: String },
    /// Per-record registrar: API key plus secret
    RegistrarB { api_key: String, api_secret: String },
    /// Zone-based provider: bearer token
    CloudflareLike { api_token: String },
}

impl Credentials {
    /// Validate a raw bundle against the shape the provider needs
    pub fn from_bundle(provider: ProviderKind, bundle: CredentialBundle) -> Result<Self> {
        let require = |value: Option<String>, field: &str| -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => Err(Error::invalid_input(format!(
                    "{} credentials require `{}`",
                    provider.display_name(),
                    field
                ))),
            }
        };

        match provider {
            ProviderKind::RegistrarA => Ok(Credentials::RegistrarA {
                api_user: require(bundle.api_user, "apiUser")?,
                api_key: require(bundle.api_key, "apiKey")?,
            }),
            ProviderKind::RegistrarB => Ok(Credentials::RegistrarB {
                api_key: require(bundle.api_key, "apiKey")?,
                api_secret: require(bundle.api_secret, "apiSecret")?,
            }),
            ProviderKind::CloudflareLike => Ok(Credentials::CloudflareLike {
                api_token: require(bundle.api_token, "apiToken")?,
            }),
        }
    }

    /// Provider these credentials belong to
    pub fn provider(&self) -> ProviderKind {
        match self {
            Credentials::RegistrarA { .. } => ProviderKind::RegistrarA,
            Credentials::RegistrarB { .. } => ProviderKind::RegistrarB,
            Credentials::CloudflareLike { .. } => ProviderKind::CloudflareLike,
        }
    }

    /// Error for an adapter handed credentials of the wrong shape
    pub fn mismatch(expected: ProviderKind, got: &Credentials) -> Error {
        Error::invalid_input(format!(
            "{} adapter received {} credentials",
            expected.display_name(),
            got.provider().display_name()
        ))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::RegistrarA { api_user, .. } => f
                .debug_struct("RegistrarA")
                .field("api_user", api_user)
                .field("api_key", &REDACTED)
                .finish(),
            Credentials::RegistrarB { .. } => f
                .debug_struct("RegistrarB")
                .field("api_key", &REDACTED)
                .field("api_secret", &REDACTED)
                .finish(),
            Credentials::CloudflareLike { .. } => f
                .debug_struct("CloudflareLike")
                .field("api_token", &REDACTED)
                .finish(),
        }
    }
}
