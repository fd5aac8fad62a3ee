//! Error types for DNS auto-configuration
//!
//! This module defines all error types used throughout the crate.
//!
//! Provider errors carry the provider's display name so that dry run can
//! surface them to the user directly. Anything that is not part of the
//! taxonomy is reported to callers through [`Error::user_message`] as a
//! generic failure.

use thiserror::Error;

/// Result type alias for DNS auto-configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The provider rejected the supplied credentials
    #[error("{provider}: authentication failed: {message}")]
    ProviderAuth {
        /// Provider display name
        provider: String,
        /// Error message
        message: String,
    },

    /// The domain or zone is unknown to the provider account
    #[error("{provider}: domain not found: {message}")]
    ProviderNotFound {
        /// Provider display name
        provider: String,
        /// Error message
        message: String,
    },

    /// Network or HTTP failure while talking to the provider
    #[error("{provider}: request failed{}: {body}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    ProviderTransport {
        /// Provider display name
        provider: String,
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Response body or transport error text
        body: String,
    },

    /// Unknown domain id, or the domain belongs to another project
    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    /// The plan cannot be built for apply (e.g. missing verification token)
    #[error("Plan validation failed: {0}")]
    PlanValidation(String),

    /// Another apply for the same domain is in flight
    #[error("Apply already in progress for domain {0}")]
    ApplyInProgress(String),

    /// Domain registry (persistence) errors
    #[error("Domain registry error: {0}")]
    Registry(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected failure
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Create a provider authentication error
    pub fn provider_auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderAuth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider "not found" error
    pub fn provider_not_found(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider transport error
    pub fn provider_transport(
        provider: impl Into<String>,
        status: Option<u16>,
        body: impl Into<String>,
    ) -> Self {
        Self::ProviderTransport {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Map a non-success HTTP status to the provider taxonomy
    ///
    /// 401/403 become [`Error::ProviderAuth`], 404 becomes
    /// [`Error::ProviderNotFound`], everything else is a transport error
    /// carrying the status and body.
    pub fn from_http_status(provider: &str, status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::provider_auth(
                provider,
                format!("invalid credentials or insufficient permissions (status {status})"),
            ),
            404 => Self::provider_not_found(provider, body),
            _ => Self::provider_transport(provider, Some(status), body),
        }
    }

    /// Create a domain "not found" error
    pub fn domain_not_found(msg: impl Into<String>) -> Self {
        Self::DomainNotFound(msg.into())
    }

    /// Create a plan validation error
    pub fn plan_validation(msg: impl Into<String>) -> Self {
        Self::PlanValidation(msg.into())
    }

    /// Create a domain registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error belongs to the provider family
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderAuth { .. } | Self::ProviderNotFound { .. } | Self::ProviderTransport { .. }
        )
    }

    /// Whether a caller may reasonably retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderTransport { status, .. } => {
                status.is_none_or(|s| s == 429 || (500..=599).contains(&s))
            }
            Self::ApplyInProgress(_) => true,
            _ => false,
        }
    }

    /// Message safe to show to an end user
    ///
    /// Provider errors name the provider; registry, JSON and internal errors
    /// collapse into a generic failure so no internal state leaks out.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderAuth { provider, .. } => format!(
                "{provider} rejected the supplied credentials. Check the API key and permissions."
            ),
            Self::ProviderNotFound { provider, message } => {
                format!("{provider} could not find the domain: {message}")
            }
            Self::ProviderTransport { provider, status: Some(status), .. } => {
                format!("{provider} returned an error (status {status}). Please try again.")
            }
            Self::ProviderTransport { provider, status: None, .. } => {
                format!("Could not reach {provider}. Please try again.")
            }
            Self::DomainNotFound(_)
            | Self::PlanValidation(_)
            | Self::ApplyInProgress(_)
            | Self::InvalidInput(_) => self.to_string(),
            Self::Registry(_) | Self::Config(_) | Self::Json(_) | Self::Internal(_) => {
                "DNS configuration failed unexpectedly. Please try again later.".to_string()
            }
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
