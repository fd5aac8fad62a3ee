// # dnsconfd - DNS auto-configuration daemon
//
// Thin integration layer: all planning, idempotency and provider logic
// lives in dnsconf-core and the provider crates.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering provider adapters
// 4. Serving the HTTP API until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Server
// - `DNSCONF_LISTEN_ADDR`: Address to bind (default `127.0.0.1:8080`)
// - `DNSCONF_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ### Plan
// - `DNSCONF_INGRESS_IPV4`: Platform ingress address for the A records
// - `DNSCONF_VERIFY_NAMESPACE`: Ownership TXT namespace (default `sitebuilder`)
// - `DNSCONF_RECORD_TTL`: TTL of planned records in seconds
//
// ### Domain Registry
// - `DNSCONF_REGISTRY_TYPE`: file or memory (default `memory`)
// - `DNSCONF_REGISTRY_PATH`: Path to the registry file (for file registry)
//
// ### Providers
// - `DNSCONF_REGISTRAR_A_URL`, `DNSCONF_REGISTRAR_B_URL`, `DNSCONF_CLOUDFLARE_URL`:
//   API base URLs
// - `DNSCONF_HTTP_TIMEOUT_SECS`: Per-request timeout
//
// ## Example
//
// ```bash
// export DNSCONF_INGRESS_IPV4=203.0.113.10
// export DNSCONF_REGISTRY_TYPE=file
// export DNSCONF_REGISTRY_PATH=/var/lib/dnsconf/domains.json
//
// dnsconfd
// ```

mod api;

use anyhow::{Context, Result};
use dnsconf_core::{
    DnsConfConfig, DomainRegistry, FileDomainRegistry, MemoryDomainRegistry, Orchestrator,
    OrchestratorEvent, ProviderRegistry, RegistryConfig,
};
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Daemon configuration as read from the environment
#[derive(Debug)]
struct Config {
    listen_addr: String,
    log_level: String,
    ingress_ipv4: Option<String>,
    verify_namespace: Option<String>,
    record_ttl: Option<String>,
    registry_type: String,
    registry_path: Option<String>,
    registrar_a_url: Option<String>,
    registrar_b_url: Option<String>,
    cloudflare_url: Option<String>,
    http_timeout_secs: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            listen_addr: lookup("DNSCONF_LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            log_level: lookup("DNSCONF_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            ingress_ipv4: lookup("DNSCONF_INGRESS_IPV4"),
            verify_namespace: lookup("DNSCONF_VERIFY_NAMESPACE"),
            record_ttl: lookup("DNSCONF_RECORD_TTL"),
            registry_type: lookup("DNSCONF_REGISTRY_TYPE").unwrap_or_else(|| "memory".to_string()),
            registry_path: lookup("DNSCONF_REGISTRY_PATH"),
            registrar_a_url: lookup("DNSCONF_REGISTRAR_A_URL"),
            registrar_b_url: lookup("DNSCONF_REGISTRAR_B_URL"),
            cloudflare_url: lookup("DNSCONF_CLOUDFLARE_URL"),
            http_timeout_secs: lookup("DNSCONF_HTTP_TIMEOUT_SECS"),
        }
    }

    /// Validate the daemon-only settings
    fn validate(&self) -> Result<()> {
        self.listen_addr.parse::<SocketAddr>().with_context(|| {
            format!(
                "DNSCONF_LISTEN_ADDR '{}' is not a socket address (e.g. 0.0.0.0:8080)",
                self.listen_addr
            )
        })?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSCONF_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        match self.registry_type.as_str() {
            "memory" => {}
            "file" => {
                if self.registry_path.as_ref().is_none_or(|p| p.trim().is_empty()) {
                    anyhow::bail!(
                        "DNSCONF_REGISTRY_PATH is required when DNSCONF_REGISTRY_TYPE=file. \
                        Set it via: export DNSCONF_REGISTRY_PATH=/var/lib/dnsconf/domains.json"
                    );
                }
            }
            other => anyhow::bail!(
                "DNSCONF_REGISTRY_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        }

        Ok(())
    }

    /// Build the core configuration, applying overrides on top of defaults
    fn to_core_config(&self) -> Result<DnsConfConfig> {
        let mut config = DnsConfConfig::new();

        if let Some(ref ingress) = self.ingress_ipv4 {
            config.plan.ingress_ipv4 = ingress
                .parse()
                .with_context(|| format!("DNSCONF_INGRESS_IPV4 '{}' is not an IPv4 address", ingress))?;
        }
        if let Some(ref namespace) = self.verify_namespace {
            config.plan.verification_namespace = namespace.clone();
        }
        if let Some(ref ttl) = self.record_ttl {
            config.plan.record_ttl = ttl
                .parse()
                .with_context(|| format!("DNSCONF_RECORD_TTL '{}' is not a number", ttl))?;
        }

        if self.registry_type == "file" {
            config.registry = RegistryConfig::File {
                path: self.registry_path.clone().unwrap_or_default(),
            };
        }

        if let Some(ref url) = self.registrar_a_url {
            config.providers.registrar_a_base_url = url.clone();
        }
        if let Some(ref url) = self.registrar_b_url {
            config.providers.registrar_b_base_url = url.clone();
        }
        if let Some(ref url) = self.cloudflare_url {
            config.providers.cloudflare_base_url = url.clone();
        }
        if let Some(ref secs) = self.http_timeout_secs {
            config.providers.http_timeout_secs = secs
                .parse()
                .with_context(|| format!("DNSCONF_HTTP_TIMEOUT_SECS '{}' is not a number", secs))?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let core_config = match config.to_core_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting dnsconfd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config, core_config).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Register every adapter compiled into this binary
fn register_providers(providers: &ProviderRegistry, config: &DnsConfConfig) -> Result<()> {
    #[cfg(feature = "registrar-a")]
    dnsconf_provider_registrar_a::register(providers, &config.providers)?;

    #[cfg(feature = "registrar-b")]
    dnsconf_provider_registrar_b::register(providers, &config.providers)?;

    #[cfg(feature = "cloudflare")]
    dnsconf_provider_cloudflare::register(providers, &config.providers)?;

    if providers.list_providers().is_empty() {
        warn!("No provider adapters compiled in; every request will fail");
    }
    Ok(())
}

async fn build_registry(config: &RegistryConfig) -> Result<Arc<dyn DomainRegistry>> {
    let registry: Arc<dyn DomainRegistry> = match config {
        RegistryConfig::File { path } => {
            info!(path = %path, "Using file domain registry");
            Arc::new(FileDomainRegistry::new(path).await?)
        }
        RegistryConfig::Memory => {
            warn!("Using in-memory domain registry; domains are lost on restart");
            Arc::new(MemoryDomainRegistry::new())
        }
    };
    Ok(registry)
}

/// Log orchestrator events until the orchestrator is dropped
async fn log_events(mut events: mpsc::Receiver<OrchestratorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            OrchestratorEvent::RollbackAttempted { domain, status } => {
                warn!(domain = %domain, status = ?status, "Rollback attempted");
            }
            OrchestratorEvent::ApplyFinished { domain, provider, success } => {
                info!(domain = %domain, provider = %provider, success, "Apply finished");
            }
            other => tracing::debug!(event = ?other, "Orchestrator event"),
        }
    }
}

async fn run_daemon(config: Config, core_config: DnsConfConfig) -> Result<()> {
    let providers = Arc::new(ProviderRegistry::new());
    register_providers(&providers, &core_config)?;
    info!(providers = ?providers.list_providers(), "Provider adapters registered");

    let registry = build_registry(&core_config.registry).await?;
    let (orchestrator, events) = Orchestrator::new(registry, providers.clone(), &core_config)?;
    let event_task = tokio::spawn(log_events(events));

    let app = api::routes(api::AppState {
        orchestrator: Arc::new(orchestrator),
        providers,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // The router (and with it the orchestrator's sender) is gone; drain what is left
    match tokio::time::timeout(EVENT_DRAIN_TIMEOUT, event_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Event logger ended abnormally: {}", e),
        Err(_) => warn!("Event logger did not finish within {:?}", EVENT_DRAIN_TIMEOUT),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to set up signal handlers: {}", e);
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", received);
}

/// Wait for CTRL-C
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for CTRL-C: {}", e);
        return;
    }
    info!("Received shutdown signal: SIGINT");
}
