//! Prelude module for wsgate.
//!
//! ```ignore
//! use wsgate::prelude::*;
//! ```
//!
//! This provides access to:
//! - Signal/slot system (`Signal`, `ConnectionId`, `ConnectionGuard`)
//! - Authorization gate (`Gate`)
//! - The session and its configuration (`Session`, `SessionConfig`, ...)
//! - Handshake headers and auth tokens (`SessionHeaders`, `AuthToken`)

// ============================================================================
// Signal/Slot System
// ============================================================================

pub use wsgate_core::signal::{ConnectionGuard, ConnectionId, Signal};

// ============================================================================
// Authorization
// ============================================================================

pub use wsgate_core::gate::Gate;

// ============================================================================
// Session
// ============================================================================

pub use wsgate_net::websocket::{
    CloseReason, ReconnectConfig, Session, SessionConfig, SessionSettings, SessionState,
};
pub use wsgate_net::{NetworkError, Result as NetResult};

// ============================================================================
// Handshake
// ============================================================================

pub use wsgate_net::tls::{Certificate, TlsConfig, TlsVersion};
pub use wsgate_net::websocket::{AuthToken, SessionHeaders};
