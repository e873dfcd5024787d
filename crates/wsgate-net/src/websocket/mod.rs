//! WebSocket session wrapper.
//!
//! This module provides a single-connection WebSocket client that supports:
//! - Plain and secure endpoints (ws:// and wss://)
//! - Handshake headers identifying the device and its authorization
//! - Manual reconnect, with optional exponential backoff
//! - Observer, signal and watch-channel delivery of inbound messages
//!
//! # Example
//!
//! ```ignore
//! use wsgate_net::websocket::{AuthToken, Session, SessionConfig, SessionHeaders};
//!
//! let headers = SessionHeaders::new()
//!     .device_token(device_id)
//!     .auth_token(AuthToken::new(token));
//!
//! let session = Session::new(
//!     SessionConfig::new("ws://localhost:9999/echo").session_headers(headers),
//! )?;
//!
//! session.opened.connect(|_| println!("Connected to server!"));
//! session.set_observer(|payload| println!("Received: {payload}"));
//!
//! session.connect();
//! ```

mod config;
mod headers;
mod message;
mod session;
mod settings;
mod token;

pub use config::{DEFAULT_CONNECT_TIMEOUT, ReconnectConfig, SessionConfig};
pub use headers::SessionHeaders;
pub use message::{CloseReason, SessionState};
pub use session::Session;
pub use settings::{ReconnectSettings, SessionSettings, TlsSettings};
pub use token::AuthToken;

/// Names of the standard handshake headers.
pub mod header_names {
    pub use super::headers::{
        ACCEPT_LANGUAGE, AUTH_TOKEN, BACKGROUND, DATE, DEVICE_TOKEN, NOTIFY, SEQUENCE, USER_AGENT,
    };
}
