//! Error types for the networking module.

/// Network-specific errors.
///
/// Errors are `Clone` so they can be delivered through
/// [`Signal`](wsgate_core::Signal)s as well as returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The endpoint URI could not be parsed or has an unsupported scheme.
    #[error("Malformed endpoint: {0}")]
    MalformedEndpoint(String),
    /// Connection refused, DNS failure, or the handshake was rejected.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The handshake did not complete within the configured timeout.
    #[error("Connection attempt timed out")]
    Timeout,
    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// A request was sent while the session was not open.
    #[error("Session is not open")]
    SendOnClosed,
    /// WebSocket protocol error on an established connection.
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    /// No async runtime was available to drive the connection.
    #[error("Runtime error: {0}")]
    Runtime(String),
    /// Settings could not be parsed or are inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::MalformedEndpoint(err.to_string())
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for NetworkError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for NetworkError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NetworkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Io(e) => Self::Connection(e.to_string()),
            WsError::Tls(e) => Self::Tls(e.to_string()),
            WsError::Url(e) => Self::MalformedEndpoint(e.to_string()),
            WsError::Http(response) => Self::Connection(format!(
                "handshake rejected with HTTP {}",
                response.status()
            )),
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
