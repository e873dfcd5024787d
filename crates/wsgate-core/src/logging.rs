//! Logging facilities for wsgate.
//!
//! wsgate uses the `tracing` crate for instrumentation. To see logs, install a
//! tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("wsgate_net=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event is tagged with one of the [`targets`] so individual subsystems
//! can be filtered with `RUST_LOG`-style directives.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "wsgate_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "wsgate_core::signal";
    /// Authorization gate target.
    pub const GATE: &str = "wsgate_core::gate";
    /// WebSocket session lifecycle target.
    pub const SESSION: &str = "wsgate_net::session";
    /// Handshake header and auth token target.
    pub const HEADERS: &str = "wsgate_net::headers";
    /// TLS configuration target.
    pub const TLS: &str = "wsgate_net::tls";
}

/// Span names used throughout wsgate for tracing.
pub mod span_names {
    /// One connection attempt, from handshake to close.
    pub const CONNECTION: &str = "wsgate::connection";
    /// Waiting out a reconnect backoff delay.
    pub const BACKOFF: &str = "wsgate::backoff";
}
