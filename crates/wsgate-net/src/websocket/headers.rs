//! Handshake headers identifying the device and its authorization.
//!
//! The remote service expects every handshake to carry the same small set of
//! headers describing the client. [`SessionHeaders`] builds them:
//!
//! ```
//! use wsgate_net::websocket::{AuthToken, SessionHeaders};
//!
//! let headers = SessionHeaders::new()
//!     .device_type("Linux")
//!     .device_token("3f9c2a")
//!     .auth_token(AuthToken::new("dG9rZW4="))
//!     .build();
//!
//! assert_eq!(headers["X-User-Agent"], "Linux");
//! assert_eq!(headers["x-good-gd-authtoken"], "dG9rZW4=");
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Local, TimeZone};

use super::token::AuthToken;
use wsgate_core::logging::targets;

/// Header carrying the client locale.
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
/// Header carrying the local time the headers were built.
pub const DATE: &str = "Date";
/// Header naming the client platform.
pub const USER_AGENT: &str = "X-User-Agent";
/// Header asking the server to push notifications.
pub const NOTIFY: &str = "X-Notify";
/// Header carrying the request sequence number.
pub const SEQUENCE: &str = "sequence";
/// Header carrying the stable device identifier.
pub const DEVICE_TOKEN: &str = "X-GC-DeviceToken";
/// Header telling the server whether the client runs in the background.
pub const BACKGROUND: &str = "x-good-background";
/// Header carrying the management layer's auth token.
pub const AUTH_TOKEN: &str = "x-good-gd-authtoken";

/// `Date` header layout, e.g. `7 Mar 2026 14:05:09 +0100`.
const DATE_FORMAT: &str = "%-d %b %Y %H:%M:%S %z";

/// Locale used when the system does not report one.
const FALLBACK_LOCALE: &str = "en-US";

/// Sequence number sent before any request has been numbered.
const INITIAL_SEQUENCE: i64 = -1;

/// Builder for the handshake header set.
#[derive(Clone, Debug)]
pub struct SessionHeaders {
    locale: Option<String>,
    date: Option<String>,
    device_type: String,
    device_token: Option<String>,
    auth_token: Option<AuthToken>,
    notify: bool,
    background: bool,
    sequence: i64,
    extra: BTreeMap<String, String>,
}

impl Default for SessionHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHeaders {
    /// Create a builder with the defaults the service expects.
    ///
    /// The device type defaults to the current OS name, the locale to the
    /// system locale and the date to the moment [`build`](Self::build) runs.
    pub fn new() -> Self {
        Self {
            locale: None,
            date: None,
            device_type: std::env::consts::OS.to_string(),
            device_token: None,
            auth_token: None,
            notify: true,
            background: false,
            sequence: INITIAL_SEQUENCE,
            extra: BTreeMap::new(),
        }
    }

    /// Override the `Accept-Language` value.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Pin the `Date` header to a specific instant.
    pub fn date<Tz>(mut self, date: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.date = Some(format_date(date));
        self
    }

    /// Set the platform name sent as `X-User-Agent`.
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Set the stable device identifier.
    pub fn device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = Some(token.into());
        self
    }

    /// Attach the management layer's auth token.
    pub fn auth_token(mut self, token: AuthToken) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Whether the server should push notifications (default `true`).
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Whether the client is running in the background (default `false`).
    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Set the sequence number (default `-1`).
    pub fn sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Add a header outside the standard set. Overrides a standard header of
    /// the same name.
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Produce the header map.
    pub fn build(self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();

        let locale = self.locale.unwrap_or_else(|| {
            sys_locale::get_locale().unwrap_or_else(|| FALLBACK_LOCALE.to_string())
        });
        let date = self.date.unwrap_or_else(|| format_date(&Local::now()));

        headers.insert(ACCEPT_LANGUAGE.to_string(), locale);
        headers.insert(DATE.to_string(), date);
        headers.insert(USER_AGENT.to_string(), self.device_type);
        headers.insert(NOTIFY.to_string(), self.notify.to_string());
        headers.insert(SEQUENCE.to_string(), self.sequence.to_string());
        headers.insert(BACKGROUND.to_string(), self.background.to_string());

        match self.device_token {
            Some(token) => {
                headers.insert(DEVICE_TOKEN.to_string(), token);
            }
            None => tracing::debug!(target: targets::HEADERS, "no device token, header omitted"),
        }
        match self.auth_token {
            Some(token) => {
                headers.insert(AUTH_TOKEN.to_string(), token.as_str().to_string());
            }
            None => tracing::warn!(target: targets::HEADERS, "building headers without an auth token"),
        }

        headers.extend(self.extra);
        headers
    }
}

fn format_date<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    date.format(DATE_FORMAT).to_string()
}
