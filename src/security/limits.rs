//! Request limits.
//!
//! # Responsibilities
//! - Cap concurrent in-flight requests (semaphore backpressure)
//! - Cap how much of a request body is read
//!
//! # Design Decisions
//! - Saturation makes requests wait rather than fail
//! - An oversized body is dropped and the request still succeeds

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Semaphore;

/// Shared semaphore bounding concurrent requests.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimit {
    permits: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimit {
    pub fn new(max: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// Middleware holding a permit for the lifetime of the request.
pub async fn limit_concurrency(
    State(limit): State<ConcurrencyLimit>,
    request: Request,
    next: Next,
) -> Response {
    if limit.available() == 0 {
        tracing::debug!(max = limit.max(), "Concurrency limit reached, waiting for a slot");
    }

    // The semaphore is never closed, so acquire only fails if it were.
    let _permit = limit.permits.acquire().await.ok();
    next.run(request).await
}

/// Read at most `limit` bytes of `body`. Oversized or broken bodies come back
/// empty.
pub async fn read_body(body: Body, limit: usize) -> Bytes {
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(limit, error = %e, "Discarding unreadable request body");
            Bytes::new()
        }
    }
}
