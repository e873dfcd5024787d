//! Session settings loaded from TOML.
//!
//! ```toml
//! endpoint = "wss://gateway.example.com:8082/service/ws"
//! connect_timeout_ms = 5000
//!
//! [headers]
//! X-Notify = "true"
//!
//! [reconnect]
//! max_attempts = 5
//! initial_delay_ms = 500
//!
//! [tls]
//! ca_file = "/etc/wsgate/ca.pem"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::config::{ReconnectConfig, SessionConfig};
use crate::error::{NetworkError, Result};
use crate::tls::{Certificate, TlsConfig, TlsVersion};

/// Top-level settings file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// The WebSocket endpoint.
    pub endpoint: String,
    /// Handshake timeout in milliseconds. `0` disables the timeout.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Extra handshake headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Automatic retry policy; absent means manual reconnect only.
    #[serde(default)]
    pub reconnect: Option<ReconnectSettings>,
    /// TLS settings for `wss://` endpoints.
    #[serde(default)]
    pub tls: Option<TlsSettings>,
}

/// `[reconnect]` table. Missing keys take the [`ReconnectConfig`] defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSettings {
    /// Retry limit; `0` means retry forever.
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

/// `[tls]` table.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TlsSettings {
    /// PEM file of additional trusted roots. Relative paths resolve against
    /// the settings file's directory.
    pub ca_file: Option<PathBuf>,
    #[serde(default)]
    pub only_custom_roots: bool,
    /// `"1.2"` or `"1.3"`.
    pub min_version: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl SessionSettings {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NetworkError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&text)?;

        if let (Some(tls), Some(dir)) = (settings.tls.as_mut(), path.parent()) {
            if let Some(ca_file) = tls.ca_file.as_mut().filter(|p| p.is_relative()) {
                *ca_file = dir.join(&*ca_file);
            }
        }
        Ok(settings)
    }

    /// Turn the settings into a [`SessionConfig`], loading any certificate files.
    pub fn into_config(self) -> Result<SessionConfig> {
        let mut config = SessionConfig::new(self.endpoint).headers(self.headers);

        match self.connect_timeout_ms {
            Some(0) => config = config.no_connect_timeout(),
            Some(ms) => config = config.connect_timeout(Duration::from_millis(ms)),
            None => {}
        }
        if let Some(reconnect) = self.reconnect {
            config = config.reconnect_config(reconnect.into_config()?);
        }
        if let Some(tls) = self.tls {
            config = config.tls_config(tls.into_config()?);
        }
        Ok(config)
    }
}

impl ReconnectSettings {
    fn into_config(self) -> Result<ReconnectConfig> {
        let mut config = ReconnectConfig::default();
        match self.max_attempts {
            Some(0) => config = config.unlimited_attempts(),
            Some(n) => config = config.max_attempts(n),
            None => {}
        }
        if let Some(ms) = self.initial_delay_ms {
            config = config.initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            config = config.max_delay(Duration::from_millis(ms));
        }
        if let Some(multiplier) = self.backoff_multiplier {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(NetworkError::Config(format!(
                    "backoff_multiplier must be at least 1.0, got {multiplier}"
                )));
            }
            config = config.backoff_multiplier(multiplier);
        }
        if config.initial_delay > config.max_delay {
            return Err(NetworkError::Config(
                "initial_delay_ms exceeds max_delay_ms".to_string(),
            ));
        }
        Ok(config)
    }
}

impl TlsSettings {
    fn into_config(self) -> Result<TlsConfig> {
        let mut config = TlsConfig::new();
        if let Some(path) = self.ca_file {
            config = config.add_root_certificate(Certificate::from_pem_file(path)?);
        }
        if self.only_custom_roots {
            config = config.use_only_custom_roots();
        }
        match self.min_version.as_deref() {
            None | Some("1.2") => {}
            Some("1.3") => config = config.min_version(TlsVersion::Tls1_3),
            Some(other) => {
                return Err(NetworkError::Config(format!(
                    "unsupported min_version '{other}', expected \"1.2\" or \"1.3\""
                )));
            }
        }
        if self.accept_invalid_certs {
            config = config.danger_accept_invalid_certs();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::DEFAULT_CONNECT_TIMEOUT;

    #[test]
    fn test_minimal_settings() {
        let settings = SessionSettings::from_toml_str(r#"endpoint = "ws://localhost:9999/echo""#)
            .unwrap();
        let config = settings.into_config().unwrap();
        assert_eq!(config.endpoint, "ws://localhost:9999/echo");
        assert!(config.reconnect.is_none());
        assert!(config.tls.is_none());
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
    }

    #[test]
    fn test_full_settings() {
        let settings = SessionSettings::from_toml_str(
            r#"
            endpoint = "wss://example.com/ws"
            connect_timeout_ms = 0

            [headers]
            X-Notify = "true"
            sequence = "-1"

            [reconnect]
            max_attempts = 0
            initial_delay_ms = 250
            max_delay_ms = 4000
            backoff_multiplier = 1.5

            [tls]
            min_version = "1.3"
            accept_invalid_certs = true
            "#,
        )
        .unwrap();

        let config = settings.into_config().unwrap();
        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.connect_timeout, None);

        let reconnect = config.reconnect.unwrap();
        assert_eq!(reconnect.max_attempts, None);
        assert_eq!(reconnect.initial_delay, Duration::from_millis(250));
        assert_eq!(reconnect.max_delay, Duration::from_millis(4000));
        assert_eq!(reconnect.backoff_multiplier, 1.5);

        let tls = config.tls.unwrap();
        assert_eq!(tls.min_version, TlsVersion::Tls1_3);
        assert!(tls.danger_accept_invalid_certs);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = SessionSettings::from_toml_str(
            r#"
            endpoint = "ws://localhost/"
            endpont = "typo"
            "#,
        );
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_invalid_reconnect_values() {
        let settings = SessionSettings::from_toml_str(
            r#"
            endpoint = "ws://localhost/"
            [reconnect]
            backoff_multiplier = 0.5
            "#,
        )
        .unwrap();
        assert!(matches!(settings.into_config(), Err(NetworkError::Config(_))));

        let settings = SessionSettings::from_toml_str(
            r#"
            endpoint = "ws://localhost/"
            [reconnect]
            initial_delay_ms = 5000
            max_delay_ms = 100
            "#,
        )
        .unwrap();
        assert!(matches!(settings.into_config(), Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_bad_tls_version() {
        let settings = SessionSettings::from_toml_str(
            r#"
            endpoint = "wss://localhost/"
            [tls]
            min_version = "1.1"
            "#,
        )
        .unwrap();
        assert!(matches!(settings.into_config(), Err(NetworkError::Config(_))));
    }
}
