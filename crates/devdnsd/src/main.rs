// # devdnsd - Device DNS Daemon
//
// Thin integration layer: all reconciliation logic lives in devdns-core.
//
// The devdnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers and building the store, directory and engine
// 4. Serving the HTTP ingest endpoint until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Provider
// - `DEVDNS_PROVIDER_TYPE`: Provider type (cloudflare, memory). Default: cloudflare
// - `DEVDNS_API_TOKEN`: Cloudflare API token
// - `DEVDNS_ACCOUNT_ID`: Cloudflare account owning the Zero Trust devices
// - `DEVDNS_ZONE_ID`: Cloudflare zone holding the device records
// - `DEVDNS_RECORD_TTL`: TTL for written records. Default: 60
// - `DEVDNS_MEMORY_DEVICES`: `id=ip,...` device table (memory provider only)
// - `DEVDNS_MODE`: `live` or `dry-run`. Default: live
//
// ### Records
// - `DEVDNS_DOMAIN_SUFFIX`: Suffix appended to every device name
//
// ### Server / Engine
// - `DEVDNS_LISTEN_ADDR`: Socket address. Default: 0.0.0.0:8080
// - `DEVDNS_MAX_BODY_BYTES`: Largest compressed request body
// - `DEVDNS_MAX_DECODED_BYTES`: Largest decompressed batch
// - `DEVDNS_DEVICE_TIMEOUT_SECS`: Per-device budget, 0 disables. Default: 20
// - `DEVDNS_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
//
// ## Example
//
// ```bash
// export DEVDNS_API_TOKEN=your_token
// export DEVDNS_ACCOUNT_ID=0123abcd
// export DEVDNS_ZONE_ID=4567ef01
// export DEVDNS_DOMAIN_SUFFIX=devices.example.com
//
// devdnsd
// ```

mod config;
mod server;

use anyhow::{Context, Result};
use config::Config;
use devdns_core::{BatchOrchestrator, EngineEvent, ProviderRegistry, ReconcileEngine};
use server::AppState;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long in-flight batches may run after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DevDnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DevDnsExitCode> for ExitCode {
    fn from(code: DevDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DevDnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DevDnsExitCode::ConfigError.into();
    }

    // Initialize tracing
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
        return DevDnsExitCode::ConfigError.into();
    }

    info!("Starting devdnsd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DevDnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DevDnsExitCode::RuntimeError
        } else {
            DevDnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let devdns_config = config.to_devdns_config();

    // Built-in "memory" provider plus whatever features are compiled in
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        devdns_provider_cloudflare::register(&registry);
    }

    info!("Provider type: {}", devdns_config.provider.type_name());
    info!("Domain suffix: {}", devdns_config.normalized_suffix());
    if config.is_dry_run() {
        warn!("DRY-RUN mode: DNS changes will be logged, not applied");
    }

    let store = registry
        .create_record_store(&devdns_config.provider)
        .context("Failed to create record store")?;
    let directory = registry
        .create_device_directory(&devdns_config.provider)
        .context("Failed to create device directory")?;

    let (engine, events) = ReconcileEngine::new(store, &devdns_config)?;
    let event_task = tokio::spawn(log_events(events));

    let orchestrator = BatchOrchestrator::new(directory, engine, &devdns_config.engine);
    let state = Arc::new(AppState {
        orchestrator,
        max_decoded_bytes: devdns_config.server.max_decoded_bytes,
    });
    let app = server::router(state, devdns_config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&devdns_config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", devdns_config.server.listen_addr))?;
    info!("Ingest server listening on {}", devdns_config.server.listen_addr);

    // Install handlers before serving so a failure is a startup error
    let shutdown = shutdown_signal()?;
    let (signalled_tx, signalled_rx) = oneshot::channel();

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        info!("Draining in-flight batches");
        let _ = signalled_tx.send(());
    })
    .into_future();

    let grace = async {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = serve => result.context("Ingest server failed")?,
        _ = grace => {
            anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_GRACE);
        }
    }

    // The router (and with it the engine's sender) is gone once serving stops
    if tokio::time::timeout(Duration::from_secs(1), event_task)
        .await
        .is_err()
    {
        warn!("Event logger did not finish");
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Forward engine events to the log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::ReconcileFailed {
                name,
                error,
                applied,
            } if !applied.is_empty() => {
                warn!(
                    "Reconciliation of {} failed after partial changes ({:?}): {}",
                    name, applied, error
                );
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// A future resolving to the name of the signal received, or an error if
/// the handlers could not be installed.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    })
}
