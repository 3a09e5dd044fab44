// src/health/evaluator.rs
use super::checker::{CheckError, Checker};
use super::result::{ComponentError, ComponentResult, Details};
use crate::metrics::{MetricsCollector, Timer};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

type CheckOutcome = Result<Details, CheckError>;

/// Runs one checker under `timeout` and reports the outcome as data.
///
/// Returns within `timeout` plus scheduling overhead whatever the checker
/// does. The checker gets a child of `cancel`; cancelling `cancel` does not
/// change the timeout. If the deadline wins, or this future is dropped
/// first, the child token is cancelled and the checker task is left to
/// finish on its own.
pub async fn evaluate(
    name: &str,
    checker: Arc<dyn Checker>,
    timeout: Duration,
    cancel: &CancellationToken,
    metrics: Option<&Arc<MetricsCollector>>,
) -> ComponentResult {
    let timer = Timer::new();
    let result = race(name, checker, timeout, cancel, metrics).await;

    if let Some(metrics) = metrics {
        metrics.record_check(name, result.status, timer.elapsed());
    }

    result
}

async fn race(
    name: &str,
    checker: Arc<dyn Checker>,
    timeout: Duration,
    cancel: &CancellationToken,
    metrics: Option<&Arc<MetricsCollector>>,
) -> ComponentResult {
    if timeout.is_zero() {
        warn!("Component {} not checked: zero timeout", name);
        return ComponentResult::deadline_exceeded(name);
    }

    let mut task = CheckTask::spawn(name, checker, cancel, metrics);

    match task.join(timeout).await {
        Some(Ok(Ok(details))) => {
            debug!("Component {} is up", name);
            ComponentResult::up(name, details)
        }
        Some(Ok(Err(err))) => {
            let (source, details) = err.into_parts();
            warn!("Component {} is down: {}", name, source);
            ComponentResult::down(name, ComponentError::Checker(source.to_string()), details)
        }
        Some(Err(join_err)) => {
            error!("Check for component {} did not complete: {}", name, join_err);
            ComponentResult::down(name, join_error(join_err), Details::new())
        }
        None => {
            warn!("Component {} exceeded deadline of {:?}", name, timeout);
            ComponentResult::deadline_exceeded(name)
        }
    }
}

fn join_error(err: JoinError) -> ComponentError {
    if !err.is_panic() {
        return ComponentError::Checker(err.to_string());
    }

    let payload = err.into_panic();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    ComponentError::Panicked(message)
}

/// A spawned check whose outcome has not been observed yet.
///
/// Dropped while the checker is still running (deadline passed, or the
/// query itself was abandoned), it cancels the checker's token and hands
/// the task to a reaper so the straggler shows up in logs and metrics.
struct CheckTask {
    name: String,
    handle: Option<JoinHandle<CheckOutcome>>,
    token: CancellationToken,
    metrics: Option<Arc<MetricsCollector>>,
}

impl CheckTask {
    fn spawn(
        name: &str,
        checker: Arc<dyn Checker>,
        cancel: &CancellationToken,
        metrics: Option<&Arc<MetricsCollector>>,
    ) -> Self {
        let token = cancel.child_token();
        let check_token = token.clone();
        let handle = tokio::spawn(async move { checker.check(check_token).await });

        Self {
            name: name.to_string(),
            handle: Some(handle),
            token,
            metrics: metrics.cloned(),
        }
    }

    /// `None` when `timeout` elapses first; the task stays owned by `self`.
    async fn join(&mut self, timeout: Duration) -> Option<Result<CheckOutcome, JoinError>> {
        let handle = self.handle.as_mut()?;
        let joined = tokio::time::timeout(timeout, handle).await.ok()?;
        self.handle = None;
        Some(joined)
    }
}

impl Drop for CheckTask {
    fn drop(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };

        self.token.cancel();
        if handle.is_finished() {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(component = %self.name, "check detached outside a runtime; not tracked");
                return;
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.check_detached();
        }
        debug!(component = %self.name, "check detached while still running");

        runtime.spawn(reap(
            std::mem::take(&mut self.name),
            handle,
            self.metrics.take(),
        ));
    }
}

// Waits out an abandoned check so its late outcome is logged and the
// detached gauge drops back.
async fn reap(
    name: String,
    handle: JoinHandle<CheckOutcome>,
    metrics: Option<Arc<MetricsCollector>>,
) {
    let timer = Timer::new();
    let outcome = handle.await;

    if let Some(metrics) = &metrics {
        metrics.detached_check_finished();
    }

    match outcome {
        Ok(Ok(_)) => debug!(
            component = %name,
            "abandoned check succeeded {:?} after detaching",
            timer.elapsed()
        ),
        Ok(Err(err)) => debug!(
            component = %name,
            %err,
            "abandoned check failed {:?} after detaching",
            timer.elapsed()
        ),
        Err(err) => warn!(component = %name, %err, "abandoned check did not complete"),
    }
}
