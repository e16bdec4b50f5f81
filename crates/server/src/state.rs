use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Semaphore};

use vidl_core::{metrics, ArtifactRegistry, Config, Extractor, RequestGate, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    gate: RequestGate,
    registry: Arc<ArtifactRegistry>,
    extractor: Arc<dyn Extractor>,
    job_slots: Arc<Semaphore>,
    metrics_registry: prometheus::Registry,
    started_at: Instant,
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> Self {
        let gate = RequestGate::new(&config.gate);
        let job_slots = Arc::new(Semaphore::new(config.downloads.max_concurrent_jobs));
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics_registry = prometheus::Registry::new();
        for metric in metrics::all_metrics() {
            // Registration only fails on duplicates, which all_metrics never produces.
            let _ = metrics_registry.register(metric);
        }

        Self {
            config,
            gate,
            registry: Arc::new(ArtifactRegistry::new()),
            extractor,
            job_slots,
            metrics_registry,
            started_at: Instant::now(),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn extractor(&self) -> &Arc<dyn Extractor> {
        &self.extractor
    }

    pub fn job_slots(&self) -> &Arc<Semaphore> {
        &self.job_slots
    }

    pub fn metrics_registry(&self) -> &prometheus::Registry {
        &self.metrics_registry
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }
}
