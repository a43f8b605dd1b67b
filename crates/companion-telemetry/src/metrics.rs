//! Prometheus metrics for Companion-Sync.
//!
//! All metrics follow the naming convention: `cs_<component>_<metric>_<unit>`
//!
//! Metrics are usable before [`register_metrics`] runs; registration only
//! makes them visible to [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SESSION MANAGER (cs-01)
    // =========================================================================

    /// Session initialization outcomes
    pub static ref SESSION_INIT: CounterVec = CounterVec::new(
        Opts::new("cs_session_init_total", "Session initializations by outcome"),
        &["outcome"]  // fetched/live_event/no_session/timeout/error
    ).expect("metric creation failed");

    /// Time from initialize() to loading=false
    pub static ref SESSION_INIT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cs_session_init_duration_seconds",
            "Time spent resolving the initial identity"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Existence-check attempts
    pub static ref EXISTENCE_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("cs_session_existence_attempts_total", "Existence-check attempts"),
        &["kind", "outcome"]  // outcome: present/absent/error
    ).expect("metric creation failed");

    // =========================================================================
    // ENTITY SYNCHRONIZERS (cs-02)
    // =========================================================================

    /// Mutations by entity kind and outcome
    pub static ref MUTATIONS: CounterVec = CounterVec::new(
        Opts::new("cs_sync_mutations_total", "Mutations by entity kind and outcome"),
        &["kind", "outcome"]  // committed/rolled_back/rejected/cancelled
    ).expect("metric creation failed");

    /// Rollbacks by entity kind and error kind
    pub static ref ROLLBACKS: CounterVec = CounterVec::new(
        Opts::new("cs_sync_rollbacks_total", "Optimistic writes rolled back"),
        &["kind", "error"]
    ).expect("metric creation failed");

    /// Change events by entity kind and disposition
    pub static ref CHANGE_EVENTS: CounterVec = CounterVec::new(
        Opts::new("cs_sync_change_events_total", "Change events handled"),
        &["kind", "disposition"]  // applied/stale/echo/buffered/removed
    ).expect("metric creation failed");

    /// Loads by entity kind and outcome
    pub static ref LOADS: CounterVec = CounterVec::new(
        Opts::new("cs_sync_loads_total", "Entity loads by outcome"),
        &["kind", "outcome"]  // present/absent/failed/cancelled
    ).expect("metric creation failed");

    // =========================================================================
    // CHANNELS
    // =========================================================================

    /// 1 while a consumer's change channel is degraded
    pub static ref CHANNEL_DEGRADED: GaugeVec = GaugeVec::new(
        Opts::new("cs_channel_degraded", "Change channel degraded (1) or healthy (0)"),
        &["consumer"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Idempotent: metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Session
        Box::new(SESSION_INIT.clone()),
        Box::new(SESSION_INIT_DURATION.clone()),
        Box::new(EXISTENCE_ATTEMPTS.clone()),
        // Synchronizers
        Box::new(MUTATIONS.clone()),
        Box::new(ROLLBACKS.clone()),
        Box::new(CHANGE_EVENTS.clone()),
        Box::new(LOADS.clone()),
        // Channels
        Box::new(CHANNEL_DEGRADED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
