//! Auth tokens issued by the device-management layer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use wsgate_core::logging::targets;

/// Field separator inside a decoded token.
const FIELD_SEPARATOR: char = '|';

/// Position of the container identifier among the decoded fields.
const CONTAINER_ID_FIELD: usize = 2;

/// An opaque auth token.
///
/// The token is sent verbatim in the handshake. Decoded, it is a
/// `|`-separated record whose third field identifies the app container.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token exactly as issued.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the container identifier, with dashes removed.
    ///
    /// Returns `None` if the token is empty, is not valid base64 or UTF-8, or
    /// has fewer than three fields.
    pub fn container_id(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }

        let decoded = match STANDARD.decode(self.0.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(target: targets::HEADERS, error = %e, "auth token is not base64");
                return None;
            }
        };
        let decoded = match String::from_utf8(decoded) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(target: targets::HEADERS, "auth token is not UTF-8");
                return None;
            }
        };

        let field = decoded.split(FIELD_SEPARATOR).nth(CONTAINER_ID_FIELD);
        if field.is_none() {
            tracing::warn!(target: targets::HEADERS, "auth token has no container field");
        }
        field.map(|id| id.replace('-', ""))
    }

    /// Like [`container_id`](Self::container_id), falling back to `default`.
    pub fn container_id_or(&self, default: impl Into<String>) -> String {
        self.container_id().unwrap_or_else(|| {
            let default = default.into();
            tracing::warn!(
                target: targets::HEADERS,
                %default,
                "unable to acquire a valid auth token, using default container id"
            );
            default
        })
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&"<redacted>").finish()
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AuthToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &str) -> AuthToken {
        AuthToken::new(STANDARD.encode(raw))
    }

    #[test]
    fn test_container_id_strips_dashes() {
        let token = encode("v1|user@example.com|1f2e-3d4c-5b6a|1700000000");
        assert_eq!(token.container_id(), Some("1f2e3d4c5b6a".to_string()));
    }

    #[test]
    fn test_container_id_missing_field() {
        let token = encode("v1|user@example.com");
        assert_eq!(token.container_id(), None);
        assert_eq!(token.container_id_or("fallback"), "fallback");
    }

    #[test]
    fn test_container_id_rejects_garbage() {
        assert_eq!(AuthToken::new("!!not base64!!").container_id(), None);
        assert_eq!(AuthToken::new("").container_id(), None);
        assert_eq!(AuthToken::new(STANDARD.encode([0xff, 0xfe, 0x7c])).container_id(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AuthToken::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
        assert_eq!(token.as_str(), "super-secret");
    }
}
