//! wsgate - a single-session WebSocket client.
//!
//! This is the umbrella crate that re-exports the public APIs of
//! `wsgate-core` (signals, the authorization gate, logging targets) and
//! `wsgate-net` (the session, its configuration and TLS).
//!
//! # Example
//!
//! ```no_run
//! use wsgate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(SessionConfig::new("ws://localhost:9999/echo"))?;
//!     session.set_observer(|payload| println!("Received: {payload}"));
//!     session.connect();
//!     Ok(())
//! }
//! ```

pub use wsgate_core::*;

/// Networking module.
pub mod net {
    pub use wsgate_net::*;
}

pub use wsgate_net::{
    AuthToken, CloseReason, NetworkError, ReconnectConfig, Session, SessionConfig, SessionHeaders,
    SessionSettings, SessionState,
};

pub mod prelude;
