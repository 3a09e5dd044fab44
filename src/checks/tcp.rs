// src/checks/tcp.rs
use crate::health::{CheckError, Checker, Details};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Up when a TCP connection to `address` can be opened.
pub struct TcpChecker {
    address: String,
}

impl TcpChecker {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Checker for TcpChecker {
    async fn check(&self, cancel: CancellationToken) -> Result<Details, CheckError> {
        let start = Instant::now();

        let mut details = Details::new();
        details.insert("address".to_string(), json!(self.address));

        let connected = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return Err(CheckError::msg("check cancelled").with_details(details));
            }
            res = TcpStream::connect(self.address.as_str()) => res,
        };

        details.insert(
            "latency_ms".to_string(),
            json!(start.elapsed().as_millis() as u64),
        );

        match connected {
            Ok(_stream) => Ok(details),
            Err(e) => Err(CheckError::new(e).with_details(details)),
        }
    }
}
