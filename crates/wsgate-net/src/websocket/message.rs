//! Session state and close reasons.

use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Current state of a WebSocket session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    /// A handshake is in flight, or a retry is scheduled.
    Connecting,
    /// Handshake completed; requests may be sent.
    Open,
    /// No connection. This is also the state before the first connect.
    #[default]
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Reason for closing a WebSocket connection (RFC 6455 section 7.4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    /// The numeric close status code.
    pub code: u16,
    /// Optional human-readable reason string.
    pub reason: Option<String>,
}

impl Default for CloseReason {
    fn default() -> Self {
        Self::normal()
    }
}

impl CloseReason {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Endpoint is going away (server shutdown, client teardown).
    pub const AWAY: u16 = 1001;

    /// Create a close reason with just a code.
    pub fn new(code: u16) -> Self {
        Self { code, reason: None }
    }

    /// Create a close reason with a code and message.
    pub fn with_reason(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
        }
    }

    /// Create a normal close reason.
    pub fn normal() -> Self {
        Self::new(Self::NORMAL)
    }

    /// Create a going-away close reason.
    pub fn away() -> Self {
        Self::new(Self::AWAY)
    }

    /// Whether the code signals a clean shutdown rather than a failure.
    pub fn is_clean(&self) -> bool {
        matches!(self.code, Self::NORMAL | Self::AWAY)
    }

    pub(crate) fn to_frame(&self) -> CloseFrame {
        CloseFrame {
            code: CloseCode::from(self.code),
            reason: self.reason.clone().unwrap_or_default().into(),
        }
    }

    pub(crate) fn from_frame(frame: &CloseFrame) -> Self {
        let reason = frame.reason.as_str();
        Self {
            code: u16::from(frame.code),
            reason: (!reason.is_empty()).then(|| reason.to_string()),
        }
    }
}
