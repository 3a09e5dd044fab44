// src/health/checker.rs
use super::result::Details;
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Probes one component.
///
/// Implementations should return promptly once `cancel` fires. A checker
/// that ignores it keeps running in the background after its evaluation
/// has already been reported as timed out; it is never force-terminated.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, cancel: CancellationToken) -> Result<Details, CheckError>;
}

/// Failure reported by a checker, optionally with partial diagnostics.
#[derive(Debug)]
pub struct CheckError {
    source: BoxError,
    details: Details,
}

impl CheckError {
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            source: error.into(),
            details: Details::new(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_parts(self) -> (BoxError, Details) {
        (self.source, self.details)
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

#[async_trait]
impl<F, Fut> Checker for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Details, CheckError>> + Send + 'static,
{
    async fn check(&self, cancel: CancellationToken) -> Result<Details, CheckError> {
        (self)(cancel).await
    }
}
