//! Proxy probe: an HTTP endpoint that echoes request metadata and guesses how
//! much the proxy in front of it reveals.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use client::{ProbeClient, ProbeError, ProbeReport};
pub use config::ProbeConfig;
pub use diagnostics::{AnonymityLevel, SpeedRating};
pub use http::{DiagnosticResponse, HttpServer};
pub use lifecycle::Shutdown;
