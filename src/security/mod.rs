//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (concurrency slot, bounded body read)
//!     → handler
//!     → headers.rs (no-store, nosniff on the way out)
//! ```

pub mod headers;
pub mod limits;

pub use headers::apply_security_headers;
pub use limits::{limit_concurrency, read_body, ConcurrencyLimit};
