//! Client for a running diagnostic endpoint.
//!
//! Sends a request (optionally through an HTTP proxy), measures the round
//! trip on this side, and rates the proxy's speed. This is where real latency
//! is measured; the server-side figure only covers processing time.

use std::time::{Duration, Instant};

use reqwest::{Client, Proxy};
use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::SpeedRating;
use crate::http::DiagnosticResponse;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid proxy address {address:?}: {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not a diagnostic document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Outcome of one probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub round_trip_ms: f64,
    pub speed: SpeedRating,
    pub response: DiagnosticResponse,
}

pub struct ProbeClient {
    client: Client,
    endpoint: String,
}

impl ProbeClient {
    /// Probe `endpoint` directly.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder().no_proxy().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Probe `endpoint` through the HTTP proxy at `proxy` (`host:port` or a
    /// full proxy URL).
    pub fn with_proxy(endpoint: &str, proxy: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let proxy_url = if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{proxy}")
        };
        let proxy = Proxy::all(&proxy_url).map_err(|source| ProbeError::InvalidProxy {
            address: proxy_url.clone(),
            source,
        })?;

        let client = Client::builder().proxy(proxy).timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Send one GET and time it.
    pub async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        let start = Instant::now();
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let round_trip_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: DiagnosticResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            round_trip_ms,
            anonymity_level = %response.anonymity_level,
            "Probe complete"
        );

        Ok(ProbeReport {
            round_trip_ms,
            speed: SpeedRating::from_latency_ms(round_trip_ms),
            response,
        })
    }
}
