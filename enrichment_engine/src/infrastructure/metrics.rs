//! Prometheus metrics for pipeline observability, grounded on the teacher's
//! `MetricsService`: a `Registry` plus one typed field per metric,
//! constructed and registered once at startup, with thin `record_*`/
//! `increment_*` methods the stages call from inside their own spans.

use enrichment_domain::error::EnrichmentError;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

const NAMESPACE: &str = "enrichment_engine";

/// Registers and exposes every metric the pipeline records. Clone is cheap:
/// every field is itself a `prometheus` handle backed by an `Arc`.
#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    requests_total: IntCounter,
    requests_failed_total: IntCounter,
    request_duration_seconds: Histogram,

    stage_duration_seconds: HistogramVec,
    stage_deadline_exceeded_total: IntCounterVec,

    component_timeout_total: IntCounterVec,
    component_error_total: IntCounterVec,

    cache_hits_total: IntCounterVec,
    cache_misses_total: IntCounterVec,

    hot_swap_active_components: IntGauge,
    hot_swap_swaps_total: IntCounter,

    entities_emitted_total: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, EnrichmentError> {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(
            Opts::new("requests_total", "Total number of pipeline requests processed").namespace(NAMESPACE),
        )
        .map_err(|err| EnrichmentError::invalid_config(format!("failed to create requests_total metric: {err}")))?;

        let requests_failed_total = IntCounter::with_opts(
            Opts::new("requests_failed_total", "Total number of requests that returned a fatal error")
                .namespace(NAMESPACE),
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create requests_failed_total metric: {err}"))
        })?;

        let request_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("request_duration_seconds", "End-to-end pipeline request latency")
                .namespace(NAMESPACE)
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create request_duration_seconds metric: {err}"))
        })?;

        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Per-stage latency within a pipeline request")
                .namespace(NAMESPACE)
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["stage"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create stage_duration_seconds metric: {err}"))
        })?;

        let stage_deadline_exceeded_total = IntCounterVec::new(
            Opts::new("stage_deadline_exceeded_total", "Stage sub-deadline overruns, by stage").namespace(NAMESPACE),
            &["stage"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create stage_deadline_exceeded_total metric: {err}"))
        })?;

        let component_timeout_total = IntCounterVec::new(
            Opts::new("component_timeout_total", "Per-component timeouts, by component id and kind")
                .namespace(NAMESPACE),
            &["kind", "component_id"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create component_timeout_total metric: {err}"))
        })?;

        let component_error_total = IntCounterVec::new(
            Opts::new("component_error_total", "Per-component transient errors, by component id and kind")
                .namespace(NAMESPACE),
            &["kind", "component_id"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create component_error_total metric: {err}"))
        })?;

        let cache_hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Cache hits, by tier").namespace(NAMESPACE),
            &["tier"],
        )
        .map_err(|err| EnrichmentError::invalid_config(format!("failed to create cache_hits_total metric: {err}")))?;

        let cache_misses_total = IntCounterVec::new(
            Opts::new("cache_misses_total", "Cache misses, by tier").namespace(NAMESPACE),
            &["tier"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create cache_misses_total metric: {err}"))
        })?;

        let hot_swap_active_components = IntGauge::with_opts(
            Opts::new("hot_swap_active_components", "Components currently in the READY state").namespace(NAMESPACE),
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create hot_swap_active_components metric: {err}"))
        })?;

        let hot_swap_swaps_total = IntCounter::with_opts(
            Opts::new("hot_swap_swaps_total", "Completed hot-swap operations").namespace(NAMESPACE),
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create hot_swap_swaps_total metric: {err}"))
        })?;

        let entities_emitted_total = IntCounterVec::new(
            Opts::new("entities_emitted_total", "Entities emitted in the final result, by source stage")
                .namespace(NAMESPACE),
            &["stage"],
        )
        .map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to create entities_emitted_total metric: {err}"))
        })?;

        for metric in [
            Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(requests_failed_total.clone()),
            Box::new(request_duration_seconds.clone()),
            Box::new(stage_duration_seconds.clone()),
            Box::new(stage_deadline_exceeded_total.clone()),
            Box::new(component_timeout_total.clone()),
            Box::new(component_error_total.clone()),
            Box::new(cache_hits_total.clone()),
            Box::new(cache_misses_total.clone()),
            Box::new(hot_swap_active_components.clone()),
            Box::new(hot_swap_swaps_total.clone()),
            Box::new(entities_emitted_total.clone()),
        ] {
            registry
                .register(metric)
                .map_err(|err| EnrichmentError::invalid_config(format!("failed to register metric: {err}")))?;
        }

        Ok(MetricsService {
            registry: Arc::new(registry),
            requests_total,
            requests_failed_total,
            request_duration_seconds,
            stage_duration_seconds,
            stage_deadline_exceeded_total,
            component_timeout_total,
            component_error_total,
            cache_hits_total,
            cache_misses_total,
            hot_swap_active_components,
            hot_swap_swaps_total,
            entities_emitted_total,
        })
    }

    pub fn record_request(&self, duration_secs: f64, failed: bool) {
        self.requests_total.inc();
        if failed {
            self.requests_failed_total.inc();
        }
        self.request_duration_seconds.observe(duration_secs);
    }

    pub fn record_stage_duration(&self, stage: &str, duration_secs: f64) {
        self.stage_duration_seconds.with_label_values(&[stage]).observe(duration_secs);
    }

    pub fn record_stage_deadline_exceeded(&self, stage: &str) {
        self.stage_deadline_exceeded_total.with_label_values(&[stage]).inc();
    }

    pub fn record_component_timeout(&self, kind: &str, component_id: &str) {
        self.component_timeout_total.with_label_values(&[kind, component_id]).inc();
    }

    pub fn record_component_error(&self, kind: &str, component_id: &str) {
        self.component_error_total.with_label_values(&[kind, component_id]).inc();
    }

    pub fn record_cache_hit(&self, tier: &str) {
        self.cache_hits_total.with_label_values(&[tier]).inc();
    }

    pub fn record_cache_miss(&self, tier: &str) {
        self.cache_misses_total.with_label_values(&[tier]).inc();
    }

    pub fn set_hot_swap_active_components(&self, count: i64) {
        self.hot_swap_active_components.set(count);
    }

    pub fn increment_hot_swap_swaps(&self) {
        self.hot_swap_swaps_total.inc();
    }

    pub fn record_entities_emitted(&self, stage: &str, count: usize) {
        self.entities_emitted_total.with_label_values(&[stage]).inc_by(count as u64);
    }

    /// Renders every registered metric in the Prometheus text exposition
    /// format, for a host to serve at its own `/metrics` endpoint.
    pub fn gather_text(&self) -> Result<String, EnrichmentError> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|err| EnrichmentError::invalid_config(format!("failed to encode metrics: {err}")))
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        MetricsService::new().expect("default metric registration never fails")
    }
}
