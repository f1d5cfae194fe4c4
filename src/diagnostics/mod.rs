//! Request diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot (built by http::request)
//!     → client_ip.rs (X-Forwarded-For inference)
//!     → anonymity.rs (transparent / anonymous / elite)
//!     → DiagnosticResult
//!
//! Client side:
//!     measured round trip → speed.rs (fast / medium / slow)
//! ```
//!
//! # Design Decisions
//! - Pure functions over a snapshot; no I/O, no shared state
//! - Malformed input degrades to a fallback value, never an error

pub mod anonymity;
pub mod client_ip;
pub mod snapshot;
pub mod speed;

use std::time::Instant;

pub use anonymity::{classify, AnonymityLevel};
pub use client_ip::{infer_client_address, is_private};
pub use snapshot::RequestSnapshot;
pub use speed::SpeedRating;

/// Values derived from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticResult {
    pub inferred_client_address: String,
    pub anonymity_level: AnonymityLevel,
    /// Time spent on this server only. Says nothing about network latency.
    pub server_processing_latency_ms: f64,
}

/// Run the heuristics over `snapshot`. `received_at` is when the request
/// reached the server.
pub fn diagnose(snapshot: &RequestSnapshot, received_at: Instant) -> DiagnosticResult {
    let inferred_client_address = infer_client_address(snapshot);

    // The server only ever sees the connecting address, so it doubles as the
    // reference proxy address and the anonymous branch cannot fire here.
    let anonymity_level = classify(snapshot, Some(&snapshot.connecting_address));

    DiagnosticResult {
        inferred_client_address,
        anonymity_level,
        server_processing_latency_ms: received_at.elapsed().as_secs_f64() * 1000.0,
    }
}
