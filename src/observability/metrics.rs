//! Metrics collection and exposition.
//!
//! # Metrics
//! - `probe_requests_total` (counter): requests by method, status
//! - `probe_request_duration_seconds` (histogram): latency by method
//! - `probe_classifications_total` (counter): anonymity verdicts by level
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::diagnostics::AnonymityLevel;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Label for a method; anything outside the standard set is `OTHER` to keep
/// label cardinality bounded.
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::PATCH => "PATCH",
        Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

pub fn record_request(method: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "probe_requests_total",
        "method" => method,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("probe_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_classification(level: AnonymityLevel) {
    metrics::counter!("probe_classifications_total", "level" => level.as_str()).increment(1);
}

/// Middleware recording request count and duration.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = method_label(request.method());
    let response = next.run(request).await;
    record_request(method, response.status().as_u16(), start);
    response
}
