// HTTP surface for the orchestrator
//
// - POST   /v1/configure-dns
// - DELETE /v1/projects/{project_id}/domains/{domain_id}
// - GET    /health

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use dnsconf_core::{
    ConfigureOutcome, ConfigureRequest, CredentialBundle, Credentials, Error, Orchestrator,
    ProviderKind, ProviderRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub providers: Arc<ProviderRegistry>,
}

/// Body of `POST /v1/configure-dns`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureDnsBody {
    #[serde(default)]
    pub dry_run: bool,
    pub project_id: String,
    pub domain: String,
    pub provider: String,
    #[serde(default)]
    pub credentials: CredentialBundle,
    #[serde(default)]
    pub domain_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/configure-dns", post(configure_dns))
        .route(
            "/v1/projects/{project_id}/domains/{domain_id}",
            delete(release_domain),
        )
        .with_state(state)
}

/// HTTP status for a core error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::ProviderAuth { .. } => StatusCode::UNAUTHORIZED,
        Error::ProviderNotFound { .. } | Error::DomainNotFound(_) => StatusCode::NOT_FOUND,
        Error::ProviderTransport { .. } => StatusCode::BAD_GATEWAY,
        Error::PlanValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::ApplyInProgress(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    (
        status,
        Json(ErrorBody {
            error: err.user_message(),
            retryable: err.is_retryable(),
        }),
    )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let providers: Vec<&str> = state
        .providers
        .list_providers()
        .iter()
        .map(ProviderKind::as_str)
        .collect();
    Json(json!({ "status": "ok", "providers": providers }))
}

async fn configure_dns(
    State(state): State<AppState>,
    Json(body): Json<ConfigureDnsBody>,
) -> Result<Json<ConfigureOutcome>, ApiError> {
    let provider = ProviderKind::parse(&body.provider).ok_or_else(|| {
        api_error(Error::invalid_input(format!(
            "Unknown provider '{}'. Supported providers: registrarA, registrarB, cloudflareLike",
            body.provider
        )))
    })?;
    let credentials = Credentials::from_bundle(provider, body.credentials).map_err(api_error)?;

    let request = ConfigureRequest {
        dry_run: body.dry_run,
        project_id: body.project_id,
        domain: body.domain,
        provider,
        credentials,
        domain_id: body.domain_id,
    };

    state
        .orchestrator
        .configure_dns(request)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn release_domain(
    State(state): State<AppState>,
    Path((project_id, domain_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let released = state
        .orchestrator
        .release_domain(&project_id, &domain_id)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({ "released": released })))
}
