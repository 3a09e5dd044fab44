// src/health/aggregator.rs
use super::error::HealthError;
use super::evaluator::evaluate;
use super::registry::Registry;
use super::result::{AggregateResult, ComponentResult};
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Answers "check everything" and "check one" queries against a [`Registry`].
///
/// Every component check is bounded by the same timeout, so an aggregate
/// query takes roughly one timeout interval at worst, however many
/// components are registered.
#[derive(Clone)]
pub struct HealthAggregator {
    registry: Arc<Registry>,
    timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthAggregator {
    pub fn new(registry: Arc<Registry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Checks every component registered at the time of the call.
    ///
    /// Component failures are reported in the result, never as an error.
    pub async fn check_all(&self, cancel: &CancellationToken) -> AggregateResult {
        let span = tracing::info_span!("check_all", query_id = %Uuid::new_v4());

        async move {
            // The read lock is released before any check starts.
            let checkers = self.registry.snapshot();

            let checks = checkers.into_iter().map(|(name, checker)| async move {
                evaluate(&name, checker, self.timeout, cancel, self.metrics.as_ref()).await
            });
            let components = futures::future::join_all(checks).await;

            let result = AggregateResult::from_components(components);

            if let Some(metrics) = &self.metrics {
                metrics.update_aggregate(
                    result.status,
                    result.components.keys().map(String::as_str),
                );
            }

            info!(
                "Health check complete: {} up, {} down",
                result.components.len() - result.down_count(),
                result.down_count()
            );

            result
        }
        .instrument(span)
        .await
    }

    /// Checks a single component by name.
    pub async fn check_one(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ComponentResult, HealthError> {
        let span = tracing::info_span!("check_one", query_id = %Uuid::new_v4(), component = %name);

        async move {
            let checker = self
                .registry
                .get(name)
                .ok_or_else(|| HealthError::ComponentNotFound(name.to_string()))?;

            Ok(evaluate(name, checker, self.timeout, cancel, self.metrics.as_ref()).await)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CheckError, Details, Status};
    use serde_json::json;

    fn aggregator(timeout_ms: u64) -> HealthAggregator {
        HealthAggregator::new(Arc::new(Registry::new()), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_empty_registry_is_up() {
        let result = aggregator(50).check_all(&CancellationToken::new()).await;
        assert_eq!(result.status, Status::Up);
        assert!(result.components.is_empty());
    }

    #[tokio::test]
    async fn test_check_one_unknown_component() {
        let err = aggregator(50)
            .check_one("missing", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, HealthError::ComponentNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_check_one_delegates_to_checker() {
        let agg = aggregator(100);
        agg.registry()
            .register(
                "db",
                Arc::new(|_cancel: CancellationToken| async {
                    let mut details = Details::new();
                    details.insert("latencyMs".to_string(), json!(1));
                    Ok::<_, CheckError>(details)
                }),
            )
            .unwrap();

        let result = agg.check_one("db", &CancellationToken::new()).await.unwrap();
        assert_eq!(result.status, Status::Up);
        assert_eq!(result.details["latencyMs"], json!(1));
    }

    #[tokio::test]
    async fn test_metrics_track_aggregate() {
        let metrics = crate::metrics::MetricsRegistry::new().unwrap();
        let agg = aggregator(50).with_metrics(metrics.collector());
        agg.registry()
            .register(
                "queue",
                Arc::new(|_cancel: CancellationToken| async {
                    Err::<Details, _>(CheckError::msg("queue unreachable"))
                }),
            )
            .unwrap();

        let result = agg.check_all(&CancellationToken::new()).await;
        assert_eq!(result.status, Status::Down);

        let text = String::from_utf8(metrics.gather()).unwrap();
        assert!(text.contains("health_aggregate_up 0"));
        assert!(text.contains("health_checks_total{component=\"queue\",status=\"down\"} 1"));
    }

    #[tokio::test]
    async fn test_deregistered_component_leaves_metrics() {
        let metrics = crate::metrics::MetricsRegistry::new().unwrap();
        let agg = aggregator(50).with_metrics(metrics.collector());
        for name in ["db", "cache"] {
            agg.registry()
                .register(
                    name,
                    Arc::new(|_cancel: CancellationToken| async { Ok::<_, CheckError>(Details::new()) }),
                )
                .unwrap();
        }

        agg.check_all(&CancellationToken::new()).await;
        let text = String::from_utf8(metrics.gather()).unwrap();
        assert!(text.contains("health_component_up{component=\"cache\"} 1"));

        assert!(agg.registry().deregister("cache"));
        agg.check_all(&CancellationToken::new()).await;

        let text = String::from_utf8(metrics.gather()).unwrap();
        assert!(!text.contains("health_component_up{component=\"cache\"}"));
        assert!(text.contains("health_component_up{component=\"db\"} 1"));
    }
}
