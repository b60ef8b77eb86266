/*!
 * # Metrics
 *
 * Process-local counters, gauges and histograms for the portal. Values are
 * exported as JSON at `/metrics` and as Prometheus text through
 * [`MetricsRegistry::export_metrics`].
 */

use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Integer gauge; fractional parts are dropped.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    value: Arc<AtomicU64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f64) {
        self.value.store(value.max(0.0) as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Relaxed) as f64
    }
}

/// Sum and count only, enough for an average.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    sum: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, value: f64) {
        self.sum.fetch_add(value.max(0.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    gauges: DashMap<String, Gauge>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_gauge(&self, name: &str) -> Gauge {
        self.gauges
            .entry(name.to_string())
            .or_insert_with(Gauge::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters.get(name).map(|c| c.get()).unwrap_or(0)
    }

    /// Prometheus text exposition, sorted by metric name.
    pub fn export_metrics(&self) -> String {
        let mut lines: Vec<(String, String)> = Vec::new();

        for entry in self.counters.iter() {
            let (name, counter) = entry.pair();
            lines.push((
                name.clone(),
                format!("# TYPE {name} counter\n{name} {}\n", counter.get()),
            ));
        }
        for entry in self.gauges.iter() {
            let (name, gauge) = entry.pair();
            lines.push((
                name.clone(),
                format!("# TYPE {name} gauge\n{name} {}\n", gauge.get()),
            ));
        }
        for entry in self.histograms.iter() {
            let (name, histogram) = entry.pair();
            lines.push((
                name.clone(),
                format!(
                    "# TYPE {name} histogram\n{name}_count {}\n{name}_sum {}\n",
                    histogram.get_count(),
                    histogram.get_sum()
                ),
            ));
        }

        lines.sort_by(|a, b| a.0.cmp(&b.0));
        lines.into_iter().map(|(_, text)| text).collect()
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let mut counters = serde_json::Map::new();
        for entry in self.counters.iter() {
            let (name, counter) = entry.pair();
            counters.insert(name.to_string(), json!(counter.get()));
        }

        let mut gauges = serde_json::Map::new();
        for entry in self.gauges.iter() {
            let (name, gauge) = entry.pair();
            gauges.insert(name.to_string(), json!(gauge.get()));
        }

        let mut histograms = serde_json::Map::new();
        for entry in self.histograms.iter() {
            let (name, histogram) = entry.pair();
            histograms.insert(
                name.to_string(),
                json!({
                    "count": histogram.get_count(),
                    "sum": histogram.get_sum(),
                }),
            );
        }

        json!({
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn increment_counter_by(name: &str, value: u64) {
    METRICS.get_or_create_counter(name).inc_by(value);
}

pub fn set_gauge(name: &str, value: f64) {
    METRICS.get_or_create_gauge(name).set(value);
}

pub fn observe_histogram(name: &str, value: f64) {
    METRICS.get_or_create_histogram(name).observe(value);
}

/// Workflow counters for the request lifecycle.
pub struct WorkflowMetrics;

impl WorkflowMetrics {
    pub fn record_submitted() {
        increment_counter("material_requests_submitted_total");
    }

    pub fn record_approved() {
        increment_counter("material_requests_approved_total");
    }

    pub fn record_rejected() {
        increment_counter("material_requests_rejected_total");
    }

    pub fn record_deleted() {
        increment_counter("material_requests_deleted_total");
    }

    pub fn record_rollback() {
        increment_counter("store_rollbacks_total");
    }

    pub fn record_notification_sent(recipients: usize) {
        increment_counter("notifications_sent_total");
        increment_counter_by("notification_recipients_total", recipients as u64);
    }

    pub fn record_notification_failed() {
        increment_counter("notifications_failed_total");
    }

    pub fn record_backend_call(duration: Duration) {
        increment_counter("backend_calls_total");
        observe_histogram("backend_call_duration_ms", duration.as_millis() as f64);
    }

    pub fn record_backend_error() {
        increment_counter("backend_errors_total");
    }

    pub fn record_document_rendered(pages: usize) {
        increment_counter("lpo_documents_rendered_total");
        increment_counter_by("lpo_pages_rendered_total", pages as u64);
    }

    pub fn set_cached_requests(count: usize) {
        set_gauge("material_requests_cached", count as f64);
    }

    pub fn set_cached_suppliers(count: usize) {
        set_gauge("suppliers_cached", count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("a").inc();
        registry.get_or_create_counter("a").inc_by(4);
        assert_eq!(registry.counter_value("a"), 5);
        assert_eq!(registry.counter_value("missing"), 0);
    }

    #[test]
    fn text_export_is_sorted() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("zeta").inc();
        registry.get_or_create_gauge("alpha").set(3.0);
        let text = registry.export_metrics();
        let alpha = text.find("alpha 3").unwrap();
        let zeta = text.find("zeta 1").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn json_export_groups_by_kind() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_histogram("latency").observe(12.0);
        registry.get_or_create_histogram("latency").observe(8.0);
        let value = registry.export_metrics_json();
        assert_eq!(value["histograms"]["latency"]["count"], 2);
        assert_eq!(value["histograms"]["latency"]["sum"], 20.0);
    }
}
