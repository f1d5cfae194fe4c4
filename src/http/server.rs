//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the diagnostic handlers
//! - Wire up middleware (request ID, tracing, metrics, limits, timeout)
//! - Serve with peer addresses and graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::PathRejection, ConnectInfo, Path, Request, State},
    middleware,
    routing::{any, get},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProbeConfig;
use crate::diagnostics::diagnose;
use crate::http::connectivity::{connectivity_check, ConnectivityChecker};
use crate::http::request::{
    assign_request_id, extract_snapshot, stamp_received_at, ReceivedAt, RequestIdExt,
};
use crate::http::response::DiagnosticResponse;
use crate::observability::metrics;
use crate::security::{apply_security_headers, limit_concurrency, read_body, ConcurrencyLimit};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub max_body_size: usize,
    pub connectivity: Arc<ConnectivityChecker>,
}

/// HTTP server for the diagnostic endpoint.
pub struct HttpServer {
    router: Router,
    config: ProbeConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProbeConfig) -> Self {
        let router = build_router(&config);
        Self { router, config }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            connectivity_check = self.config.connectivity_check.enabled,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

/// Build the router with all middleware layers.
///
/// The last layer added runs first: security headers, receipt timestamp,
/// request ID, trace span, metrics, concurrency limit, timeout.
#[allow(deprecated)]
pub fn build_router(config: &ProbeConfig) -> Router {
    let state = AppState {
        max_body_size: config.security.max_body_size,
        connectivity: Arc::new(ConnectivityChecker::new(&config.connectivity_check)),
    };

    let mut routes = Router::new()
        .route("/", any(diagnose_root))
        .route("/{*path}", any(diagnose_path))
        .fallback(diagnose_raw_path);

    if config.connectivity_check.enabled {
        routes = routes.route(
            &config.connectivity_check.path,
            get(connectivity_check).fallback(diagnose_raw_path),
        );
    }

    let router = routes
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(
            ConcurrencyLimit::new(config.listener.max_connections),
            limit_concurrency,
        ))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn(assign_request_id))
        .layer(middleware::from_fn(stamp_received_at));

    if config.security.enable_headers {
        apply_security_headers(router)
    } else {
        router
    }
}

fn make_request_span(request: &Request) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request.request_id(),
        method = %request.method(),
        uri = %request.uri(),
    )
}

async fn diagnose_root(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Json<DiagnosticResponse> {
    diagnose_request(&state, String::new(), peer, request).await
}

async fn diagnose_path(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Json<DiagnosticResponse> {
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => {
            // Undecodable percent escapes: echo the raw path instead.
            tracing::debug!(error = %rejection, "Falling back to raw request path");
            let raw = request.uri().path();
            raw.strip_prefix('/').unwrap_or(raw).to_string()
        }
    };
    diagnose_request(&state, path, peer, request).await
}

/// Requests no path route captures: other methods on the connectivity check
/// route, and the asterisk-form target (`OPTIONS *`).
async fn diagnose_raw_path(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Json<DiagnosticResponse> {
    let path = request.uri().path().to_string();
    diagnose_request(&state, path, peer, request).await
}

async fn diagnose_request(
    state: &AppState,
    path: String,
    peer: SocketAddr,
    request: Request,
) -> Json<DiagnosticResponse> {
    let received_at = request
        .extensions()
        .get::<ReceivedAt>()
        .map(|received| received.0)
        .unwrap_or_else(Instant::now);

    let (parts, body) = request.into_parts();
    let body = read_body(body, state.max_body_size).await;

    let connecting_address = peer.ip().to_canonical().to_string();
    let snapshot = extract_snapshot(&path, &parts, &body, connecting_address).await;
    let result = diagnose(&snapshot, received_at);

    metrics::record_classification(result.anonymity_level);
    tracing::debug!(
        request_id = %parts.request_id(),
        method = %snapshot.method,
        path = %snapshot.path,
        connecting_ip = %snapshot.connecting_address,
        client_ip = %result.inferred_client_address,
        anonymity_level = %result.anonymity_level,
        "Request diagnosed"
    );

    Json(DiagnosticResponse::assemble(snapshot, result))
}
