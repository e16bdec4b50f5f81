use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidl_core::{
    load_config, validate_config, Extractor, ExtractorBinding, RetentionSweeper, YtDlpExtractor,
};

use vidl_server::api::create_router;
use vidl_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Interval between rate-limit table purges
const GATE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("VIDL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully (version {})", VERSION);
    info!("Artifact directory: {:?}", config.downloads.dir);

    tokio::fs::create_dir_all(&config.downloads.dir)
        .await
        .with_context(|| format!("Failed to create artifact dir {:?}", config.downloads.dir))?;

    // Probe the extraction binary before accepting any request
    let binding = ExtractorBinding::probe(&config.extractor)
        .await
        .context("Extractor probe failed")?;
    info!(
        "Extractor ready: {} ({})",
        binding.bin().display(),
        binding.version()
    );

    let extractor: Arc<dyn Extractor> =
        Arc::new(YtDlpExtractor::new(binding, config.extractor.clone()));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), extractor));

    // Start retention sweeper
    let sweeper = RetentionSweeper::new(config.downloads.clone(), Arc::clone(state.registry()));
    sweeper.start();

    // Purge expired rate-limit windows on a timer
    spawn_gate_purge(Arc::clone(&state));

    // Create router
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");
    sweeper.stop();

    // Cancel pending grace-delete tasks; the next run's sweeper covers them.
    let _ = state.shutdown_tx().send(());

    Ok(())
}

/// Periodically drop expired rate-limit entries so idle clients do not
/// accumulate in the table.
fn spawn_gate_purge(state: Arc<AppState>) {
    let mut shutdown_rx = state.shutdown_tx().subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(GATE_PURGE_INTERVAL) => {
                    let purged = state.gate().purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "purged expired rate-limit windows");
                    }
                }
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
