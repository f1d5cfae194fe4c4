//! Legacy external connectivity check.
//!
//! `GET <path>?ip=<host:port>` fetches the configured target URL through the
//! given HTTP proxy:
//! - missing `ip` → 400
//! - upstream 200 → 200 "OK"
//! - any other upstream status → 502 "FAIL"
//! - no connection, timeout, bad proxy address → 504 "FAIL"

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::config::ConnectivityCheckConfig;
use crate::http::server::AppState;

/// Result of fetching the target through a proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Reachable,
    UpstreamStatus(StatusCode),
    Unreachable(String),
}

impl CheckOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckOutcome::Reachable => StatusCode::OK,
            CheckOutcome::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            CheckOutcome::Unreachable(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            CheckOutcome::Reachable => "OK",
            _ => "FAIL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectivityChecker {
    target_url: String,
    timeout: Duration,
}

impl ConnectivityChecker {
    pub fn new(config: &ConnectivityCheckConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Fetch the target through `proxy` (`host:port`).
    pub async fn check(&self, proxy: &str) -> CheckOutcome {
        let proxy = match reqwest::Proxy::all(format!("http://{proxy}")) {
            Ok(p) => p,
            Err(e) => return CheckOutcome::Unreachable(e.to_string()),
        };
        let client = match reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => return CheckOutcome::Unreachable(e.to_string()),
        };

        match client.get(&self.target_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => CheckOutcome::Reachable,
            Ok(response) => CheckOutcome::UpstreamStatus(response.status()),
            Err(e) => CheckOutcome::Unreachable(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub ip: Option<String>,
}

pub async fn connectivity_check(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> (StatusCode, &'static str) {
    let Some(proxy) = params.ip.filter(|ip| !ip.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing IP");
    };

    let outcome = state.connectivity.check(proxy.trim()).await;
    match &outcome {
        CheckOutcome::Reachable => tracing::info!(proxy = %proxy, "Connectivity check passed"),
        CheckOutcome::UpstreamStatus(status) => {
            tracing::warn!(proxy = %proxy, status = %status, "Connectivity check got upstream error")
        }
        CheckOutcome::Unreachable(error) => {
            tracing::warn!(proxy = %proxy, error = %error, "Connectivity check failed")
        }
    }

    (outcome.status_code(), outcome.body())
}
