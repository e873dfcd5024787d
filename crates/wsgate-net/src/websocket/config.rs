//! Session and reconnect configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;

use super::headers::SessionHeaders;
use crate::tls::TlsConfig;

/// Default bound on a single handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a WebSocket session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// The WebSocket endpoint (ws:// or wss://).
    pub endpoint: String,
    /// Headers sent with the handshake.
    pub headers: BTreeMap<String, String>,
    /// Automatic retry policy. If `None`, failures wait for a manual reconnect.
    pub reconnect: Option<ReconnectConfig>,
    /// TLS configuration for `wss://` endpoints.
    pub tls: Option<TlsConfig>,
    /// Upper bound on a single handshake. `None` waits for the OS to give up.
    pub connect_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a configuration for the given endpoint.
    ///
    /// The endpoint is validated when the session is built.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            reconnect: None,
            tls: None,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Add a handshake header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple handshake headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add every header produced by a [`SessionHeaders`] builder.
    pub fn session_headers(self, headers: SessionHeaders) -> Self {
        self.headers(headers.build())
    }

    /// Enable automatic retries with default backoff settings.
    pub fn auto_reconnect(mut self) -> Self {
        self.reconnect = Some(ReconnectConfig::default());
        self
    }

    /// Enable automatic retries with a custom policy.
    pub fn reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = Some(config);
        self
    }

    /// Set TLS configuration for secure endpoints.
    pub fn tls_config(mut self, config: TlsConfig) -> Self {
        self.tls = Some(config);
        self
    }

    /// Set the handshake timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Remove the handshake timeout.
    pub fn no_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }
}

/// Bounded exponential backoff for automatic reconnection.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectConfig {
    /// Maximum number of retries after the first failure. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Retry until a connection succeeds or the session is closed.
    pub fn unlimited_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Whether retry number `attempt` (0-indexed) is allowed.
    pub fn should_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Delay before retry number `attempt` (0-indexed), with ±10% jitter.
    ///
    /// The result never exceeds `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let exp = attempt.min(i32::MAX as u32) as i32;
        let max_ms = self.max_delay.as_millis() as f64;
        let delay_ms = (base_ms * self.backoff_multiplier.powi(exp)).min(max_ms);

        let jitter_ms = delay_ms * 0.1;
        let jittered = if jitter_ms >= 1.0 {
            delay_ms + rand::thread_rng().gen_range(-jitter_ms..=jitter_ms)
        } else {
            delay_ms
        };

        Duration::from_millis(jittered.clamp(0.0, max_ms) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_is_capped() {
        let config = ReconnectConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(1000))
            .backoff_multiplier(2.0);

        for _ in 0..50 {
            let first = config.delay_for_attempt(0);
            assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(110));

            let third = config.delay_for_attempt(2);
            assert!(third >= Duration::from_millis(360) && third <= Duration::from_millis(440));

            assert!(config.delay_for_attempt(10) <= Duration::from_millis(1000));
            assert!(config.delay_for_attempt(u32::MAX) <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_should_attempt_respects_max() {
        let config = ReconnectConfig::new().max_attempts(2);
        assert!(config.should_attempt(0));
        assert!(config.should_attempt(1));
        assert!(!config.should_attempt(2));

        let unlimited = ReconnectConfig::new().unlimited_attempts();
        assert!(unlimited.should_attempt(u32::MAX - 1));
    }

    #[test]
    fn test_tiny_delays_skip_jitter() {
        let config = ReconnectConfig::new()
            .initial_delay(Duration::from_millis(5))
            .backoff_multiplier(1.0);
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(5));
    }
}
