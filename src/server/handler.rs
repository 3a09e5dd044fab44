// src/server/handler.rs
use crate::health::{HealthAggregator, HealthError, Status};
use crate::metrics::MetricsRegistry;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::Service;

/// Serves `/health`, `/health/{name}` and optionally the metrics endpoint.
#[derive(Clone)]
pub struct HealthHandler {
    aggregator: Arc<HealthAggregator>,
    metrics: Option<(Arc<MetricsRegistry>, Arc<str>)>,
}

impl HealthHandler {
    pub fn new(aggregator: Arc<HealthAggregator>) -> Self {
        Self {
            aggregator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>, path: impl Into<Arc<str>>) -> Self {
        self.metrics = Some((registry, path.into()));
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        if req.method() != Method::GET {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        let path = req.uri().path();

        if let Some((registry, metrics_path)) = &self.metrics {
            if path == metrics_path.as_ref() {
                let mut response = Response::new(Body::from(registry.gather()));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                return response;
            }
        }

        // Dropping the request future (client went away) cancels its checks.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        match path.strip_prefix("/health") {
            Some("") | Some("/") => {
                let result = self.aggregator.check_all(&cancel).await;
                json_response(status_code(result.status), &result)
            }
            Some(rest) if rest.starts_with('/') => {
                let name = &rest[1..];
                match self.aggregator.check_one(name, &cancel).await {
                    Ok(result) => json_response(status_code(result.status), &result),
                    Err(e @ HealthError::ComponentNotFound(_)) => {
                        json_response(StatusCode::NOT_FOUND, &json!({ "error": e.to_string() }))
                    }
                    Err(e) => json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &json!({ "error": e.to_string() }),
                    ),
                }
            }
            _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
        }
    }
}

impl Service<Request<Body>> for HealthHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}

fn status_code(status: Status) -> StatusCode {
    match status {
        Status::Up => StatusCode::OK,
        Status::Down => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!(%e, "failed to serialize response");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn text_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CheckError, Details, Registry};
    use std::time::Duration;

    fn handler() -> HealthHandler {
        let registry = Arc::new(Registry::new());
        registry
            .register(
                "db",
                Arc::new(|_cancel: CancellationToken| async { Ok::<_, CheckError>(Details::new()) }),
            )
            .unwrap();
        registry
            .register(
                "cache",
                Arc::new(|_cancel: CancellationToken| async {
                    Err::<Details, _>(CheckError::msg("evicted"))
                }),
            )
            .unwrap();

        let aggregator = HealthAggregator::new(registry, Duration::from_millis(100));
        HealthHandler::new(Arc::new(aggregator))
    }

    async fn get(handler: &HealthHandler, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let response = handler.handle(req).await;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_aggregate_endpoint_reports_down() {
        let (status, body) = get(&handler(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "down");
        assert_eq!(body["components"]["cache"]["error"], "evicted");
        assert_eq!(body["components"]["db"]["status"], "up");
    }

    #[tokio::test]
    async fn test_single_endpoint() {
        let (status, body) = get(&handler(), "/health/db").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "db");

        let (status, body) = get(&handler(), "/health/queue").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Component not found: queue");
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let (status, _) = get(&handler(), "/healthz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = Request::post("/health").body(Body::empty()).unwrap();
        let response = handler().handle(req).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let handler = handler().with_metrics(metrics, "/metrics");

        let req = Request::get("/metrics").body(Body::empty()).unwrap();
        let response = handler.handle(req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
