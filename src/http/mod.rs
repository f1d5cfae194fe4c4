//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, receipt time, snapshot extraction)
//!     → diagnostics (client address, anonymity)
//!     → response.rs (diagnostic JSON)
//!     → Send to client
//!
//! Optional:
//!     → connectivity.rs (legacy proxy reachability check)
//! ```

pub mod connectivity;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::DiagnosticResponse;
pub use server::{build_router, HttpServer};
