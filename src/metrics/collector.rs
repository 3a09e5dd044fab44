// src/metrics/collector.rs
use crate::health::Status;
use anyhow::Result;
use parking_lot::Mutex;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Renders every registered metric in the text exposition format.
    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

pub struct MetricsCollector {
    // Per-component metrics
    pub checks_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub component_up: IntGaugeVec,

    // Aggregate metrics
    pub aggregate_up: IntGauge,
    pub registered_components: IntGauge,
    pub detached_checks: IntGauge,

    // Components with a live `health_component_up` series
    reported: Mutex<HashSet<String>>,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let checks_total = IntCounterVec::new(
            Opts::new("health_checks_total", "Total number of component checks"),
            &["component", "status"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_check_duration_seconds",
                "Component check duration in seconds",
            ),
            &["component"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let component_up = IntGaugeVec::new(
            Opts::new(
                "health_component_up",
                "Last observed component status (1=up, 0=down)",
            ),
            &["component"],
        )?;
        registry.register(Box::new(component_up.clone()))?;

        let aggregate_up = IntGauge::new(
            "health_aggregate_up",
            "Last aggregate status (1=up, 0=down)",
        )?;
        registry.register(Box::new(aggregate_up.clone()))?;

        let registered_components = IntGauge::new(
            "health_registered_components",
            "Components covered by the last aggregate check",
        )?;
        registry.register(Box::new(registered_components.clone()))?;

        let detached_checks = IntGauge::new(
            "health_detached_checks",
            "Abandoned checks still running in the background",
        )?;
        registry.register(Box::new(detached_checks.clone()))?;

        Ok(Self {
            checks_total,
            check_duration_seconds,
            component_up,
            aggregate_up,
            registered_components,
            detached_checks,
            reported: Mutex::new(HashSet::new()),
        })
    }

    pub fn record_check(&self, component: &str, status: Status, duration: std::time::Duration) {
        self.checks_total
            .with_label_values(&[component, status.as_str()])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[component])
            .observe(duration.as_secs_f64());

        self.component_up
            .with_label_values(&[component])
            .set(status.is_up() as i64);

        self.reported.lock().insert(component.to_string());
    }

    /// Records an aggregate pass over `components`. Status series for
    /// components missing from it (deregistered since) are dropped.
    pub fn update_aggregate<'a, I>(&self, status: Status, components: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: HashSet<&str> = components.into_iter().collect();

        self.aggregate_up.set(status.is_up() as i64);
        self.registered_components.set(current.len() as i64);

        let mut reported = self.reported.lock();
        reported.retain(|component| {
            if current.contains(component.as_str()) {
                return true;
            }
            if let Err(e) = self.component_up.remove_label_values(&[component.as_str()]) {
                tracing::debug!("No status series for {}: {}", component, e);
            }
            false
        });
    }

    pub fn check_detached(&self) {
        self.detached_checks.inc();
    }

    pub fn detached_check_finished(&self) {
        self.detached_checks.dec();
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_check_updates_component_gauge() {
        let metrics = MetricsRegistry::new().unwrap();
        let collector = metrics.collector();

        collector.record_check("db", Status::Up, Duration::from_millis(5));
        collector.record_check("db", Status::Down, Duration::from_millis(5));

        let text = String::from_utf8(metrics.gather()).unwrap();
        assert!(text.contains("health_component_up{component=\"db\"} 0"));
        assert!(text.contains("health_checks_total{component=\"db\",status=\"up\"} 1"));
        assert!(text.contains("health_checks_total{component=\"db\",status=\"down\"} 1"));
    }

    #[test]
    fn test_aggregate_drops_stale_component_series() {
        let metrics = MetricsRegistry::new().unwrap();
        let collector = metrics.collector();

        collector.record_check("db", Status::Up, Duration::from_millis(5));
        collector.record_check("cache", Status::Down, Duration::from_millis(5));
        collector.update_aggregate(Status::Up, ["db"]);

        let text = String::from_utf8(metrics.gather()).unwrap();
        assert!(text.contains("health_component_up{component=\"db\"} 1"));
        assert!(!text.contains("health_component_up{component=\"cache\"}"));
        assert!(text.contains("health_registered_components 1"));
    }

    #[test]
    fn test_detached_gauge() {
        let metrics = MetricsRegistry::new().unwrap();
        let collector = metrics.collector();

        collector.check_detached();
        collector.check_detached();
        collector.detached_check_finished();

        assert_eq!(collector.detached_checks.get(), 1);
    }
}
