//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Request gate (admissions, rejections)
//! - Extraction jobs (attempts, duration)
//! - Delivery (bytes streamed)
//! - Retention (files swept)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Request Gate Metrics
// =============================================================================

/// Gate decisions total by outcome.
pub static GATE_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidl_gate_decisions_total", "Total gate admission decisions"),
        &["outcome"], // "admitted", "invalid_url", "unsupported_domain", "rate_limited"
    )
    .unwrap()
});

// =============================================================================
// Extraction Job Metrics
// =============================================================================

/// Extraction jobs total by result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidl_jobs_total", "Total extraction jobs"),
        &["result"], // "succeeded", "failed", "timed_out"
    )
    .unwrap()
});

/// Extraction duration in seconds.
pub static EXTRACTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vidl_extraction_duration_seconds",
            "Duration of extraction jobs",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["result"],
    )
    .unwrap()
});

/// Jobs currently running or waiting for a slot.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("vidl_jobs_in_flight", "Extraction jobs currently in flight").unwrap()
});

// =============================================================================
// Delivery Metrics
// =============================================================================

/// Artifact bytes handed to response bodies.
pub static BYTES_DELIVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidl_bytes_delivered_total",
        "Total artifact bytes delivered to clients",
    )
    .unwrap()
});

// =============================================================================
// Retention Metrics
// =============================================================================

/// Expired artifacts deleted by the sweeper.
pub static FILES_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidl_files_swept_total",
        "Total expired artifacts deleted by the retention sweeper",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(GATE_DECISIONS.clone()),
        Box::new(JOBS_TOTAL.clone()),
        Box::new(EXTRACTION_DURATION.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
        Box::new(BYTES_DELIVERED.clone()),
        Box::new(FILES_SWEPT.clone()),
    ]
}
