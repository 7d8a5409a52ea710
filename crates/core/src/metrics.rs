//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Saga outcomes and durations
//! - Retry executor attempts per operation class
//! - Compensation deletes
//! - Media fetches and thumbnail tiers

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Saga Metrics
// =============================================================================

/// Terminal saga outcomes by status.
pub static SAGA_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("uploader_saga_outcomes_total", "Total sagas by terminal status"),
        &["status"], // "success", "failed"
    )
    .unwrap()
});

/// Saga duration in seconds.
pub static SAGA_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "uploader_saga_duration_seconds",
            "Duration of a resource creation saga",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["status"],
    )
    .unwrap()
});

/// Item failures by the stage that failed.
pub static ITEM_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "uploader_item_failures_total",
            "Media items skipped after a non-fatal failure",
        ),
        &["stage"], // "resolve", "upload", "creative", "ad"
    )
    .unwrap()
});

// =============================================================================
// Retry Metrics
// =============================================================================

/// Attempts made by the retry executor.
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "uploader_retry_attempts_total",
            "Attempts made by the retry executor",
        ),
        &["operation", "outcome"], // outcome: "success", "transient", "permanent", "exhausted"
    )
    .unwrap()
});

// =============================================================================
// Compensation Metrics
// =============================================================================

/// Compensating deletes by resource kind and result.
pub static COMPENSATION_DELETES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "uploader_compensation_deletes_total",
            "Compensating delete calls issued after a saga failure",
        ),
        &["kind", "result"], // result: "deleted", "failed"
    )
    .unwrap()
});

// =============================================================================
// Media Metrics
// =============================================================================

/// Media fetches by kind, source class and result.
pub static MEDIA_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("uploader_media_fetch_total", "Media resolutions"),
        &["kind", "source", "result"],
    )
    .unwrap()
});

/// Thumbnail extraction by the tier that produced the image.
pub static THUMBNAIL_TIERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "uploader_thumbnail_tier_total",
            "Thumbnails produced per fallback tier",
        ),
        &["tier"], // "decoder", "ffmpeg", "placeholder", "none"
    )
    .unwrap()
});

/// All core metrics, for registration in the server registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SAGA_OUTCOMES.clone()),
        Box::new(SAGA_DURATION.clone()),
        Box::new(ITEM_FAILURES.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
        Box::new(COMPENSATION_DELETES.clone()),
        Box::new(MEDIA_FETCHES.clone()),
        Box::new(THUMBNAIL_TIERS.clone()),
    ]
}
