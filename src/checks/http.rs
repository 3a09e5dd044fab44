// src/checks/http.rs
use crate::health::{CheckError, Checker, Details};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Probes an HTTP endpoint with a GET request.
///
/// Up on any 2xx response, or on exactly `expected_status` when set.
pub struct HttpChecker {
    url: Url,
    expected_status: Option<u16>,
    client: Client,
}

impl HttpChecker {
    pub fn new(url: Url, expected_status: Option<u16>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url,
            expected_status,
            client,
        })
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, cancel: CancellationToken) -> Result<Details, CheckError> {
        let start = Instant::now();

        let mut details = Details::new();
        details.insert("url".to_string(), json!(self.url.as_str()));

        let response = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return Err(CheckError::msg("check cancelled").with_details(details));
            }
            res = self.client.get(self.url.clone()).send() => res,
        };

        details.insert(
            "latency_ms".to_string(),
            json!(start.elapsed().as_millis() as u64),
        );

        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(CheckError::new(e).with_details(details)),
        };

        let status = response.status();
        details.insert("status_code".to_string(), json!(status.as_u16()));

        let healthy = match self.expected_status {
            Some(code) => status.as_u16() == code,
            None => status.is_success(),
        };

        if healthy {
            Ok(details)
        } else {
            Err(CheckError::msg(format!("HTTP {}", status)).with_details(details))
        }
    }
}
