//! Retention sweeper.
//!
//! Periodically scans the artifact directory and deletes files older than the
//! retention window, skipping anything the registry reports as in use. The
//! sweeper is the safety net behind per-delivery grace deletion: crashed
//! deliveries, abandoned partials and files from before a restart all get
//! cleaned up here eventually.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::DownloadsConfig;
use crate::metrics;
use crate::registry::ArtifactRegistry;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub examined: usize,
    pub deleted: usize,
    pub skipped_in_use: usize,
    pub failed: usize,
}

/// Background deleter of expired artifacts.
pub struct RetentionSweeper {
    config: DownloadsConfig,
    registry: Arc<ArtifactRegistry>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RetentionSweeper {
    pub fn new(config: DownloadsConfig, registry: Arc<ArtifactRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            registry,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the sweep loop. The first pass runs immediately so stale files
    /// from a previous run do not wait a full interval.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Retention sweeper already running");
            return;
        }

        info!(
            dir = %self.config.dir.display(),
            retention_secs = self.config.retention_secs,
            interval_secs = self.config.sweep_interval_secs,
            "Starting retention sweeper"
        );

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let interval = Duration::from_secs(config.sweep_interval_secs);
            loop {
                let stats = sweep(&config.dir, config.retention_secs, &registry).await;
                if stats.deleted > 0 || stats.failed > 0 {
                    info!(
                        examined = stats.examined,
                        deleted = stats.deleted,
                        skipped_in_use = stats.skipped_in_use,
                        failed = stats.failed,
                        "Sweep pass completed"
                    );
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Retention sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }
            info!("Retention sweeper stopped");
        });
    }

    /// Stop the sweep loop.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run a single pass outside the loop.
    pub async fn sweep_once(&self) -> SweepStats {
        sweep(&self.config.dir, self.config.retention_secs, &self.registry).await
    }
}

/// One pass over `dir`: delete regular files older than `retention_secs`
/// unless the registry holds them. Failures on individual entries are
/// counted and skipped, never aborting the pass.
pub async fn sweep(dir: &Path, retention_secs: u64, registry: &ArtifactRegistry) -> SweepStats {
    let mut stats = SweepStats::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "Sweep cannot read artifact dir: {}", e);
            return stats;
        }
    };

    let retention = Duration::from_secs(retention_secs);
    let now = SystemTime::now();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Sweep failed to read directory entry: {}", e);
                stats.failed += 1;
                continue;
            }
        };

        let path = entry.path();
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), "Sweep failed to stat: {}", e);
                stats.failed += 1;
                continue;
            }
        };

        if !meta.is_file() {
            continue;
        }
        stats.examined += 1;

        // In-use files are never touched, no matter how old.
        if registry.is_in_use(&path) {
            debug!(path = %path.display(), "Sweep skipping in-use artifact");
            stats.skipped_in_use += 1;
            continue;
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        if age < retention {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "Sweep deleted expired artifact");
                metrics::FILES_SWEPT.inc();
                stats.deleted += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted concurrently, nothing left to do.
            }
            Err(e) => {
                warn!(path = %path.display(), "Sweep failed to delete: {}", e);
                stats.failed += 1;
            }
        }
    }

    stats
}
