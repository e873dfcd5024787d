//! Networking module for wsgate.
//!
//! This crate provides the WebSocket session wrapper and everything it needs
//! to reach a real server:
//!
//! - **Session**: One client connection with connect, send, reconnect and
//!   open-state query; inbound messages go to a registered observer
//! - **Handshake headers**: The device and authorization headers the remote
//!   service expects
//! - **TLS**: Custom roots and minimum version for `wss://` endpoints
//! - **Settings**: TOML files describing a session
//!
//! # Session
//!
//! ```ignore
//! use wsgate_net::{Session, SessionConfig};
//!
//! let session = Session::new(SessionConfig::new("ws://localhost:9999/echo"))?;
//! session.set_observer(|payload| println!("Received: {payload}"));
//! session.connect();
//!
//! // Once the state reaches Open:
//! session.send_request("ping")?;
//! ```
//!
//! ## Failure handling
//!
//! Nothing is retried unless a [`ReconnectConfig`] is set. A failed handshake
//! leaves the session `Closed`, reports the error on
//! [`Session::error`](websocket::Session::error) and waits for
//! [`Session::reconnect`](websocket::Session::reconnect).
//!
//! ```ignore
//! let config = SessionConfig::new("wss://gateway.example.com/ws")
//!     .reconnect_config(ReconnectConfig::new().max_attempts(5))
//!     .connect_timeout(Duration::from_secs(5));
//! ```

mod error;
pub mod tls;
pub mod websocket;

pub use error::{NetworkError, Result};

// Re-export commonly used types at the crate root
pub use tls::{Certificate, TlsConfig, TlsVersion};
pub use websocket::{
    AuthToken, CloseReason, ReconnectConfig, Session, SessionConfig, SessionHeaders,
    SessionSettings, SessionState,
};
