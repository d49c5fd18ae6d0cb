//! Tool discovery port
//!
//! Defines [`ToolDiscoveryPort`], the contract of the Transport Negotiator,
//! and the [`Credentials`] callers hand to it.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use toolgate_domain::ToolDescriptor;

/// Discovery failure. Transport details never leak past this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Every transport variant was tried and failed.
    #[error("Tool server unavailable ({})", attempts.join("; "))]
    ServiceUnavailable { attempts: Vec<String> },

    /// The overall discovery deadline passed.
    #[error("Tool discovery timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl DiscoveryError {
    /// Discovery failures are always recoverable by retrying later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DiscoveryError::InvalidCredentials(_))
    }
}

/// Caller-supplied credentials for the tool server.
///
/// The token is stored without any `Bearer ` prefix; `Debug` never prints
/// it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    pub entity_id: String,
    pub organization_id: String,
}

impl Credentials {
    pub fn new(
        token: &str,
        entity_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let token = normalize_token(token);
        if token.is_empty() {
            return Err(DiscoveryError::InvalidCredentials(
                "empty bearer token".to_string(),
            ));
        }
        Ok(Self {
            token,
            entity_id: entity_id.into(),
            organization_id: organization_id.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[redacted]")
            .field("entity_id", &self.entity_id)
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Strip a case-insensitive `Bearer ` prefix and surrounding whitespace.
pub fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim();
    match (trimmed.get(..6), trimmed.get(6..)) {
        (Some(prefix), Some(rest))
            if prefix.eq_ignore_ascii_case("bearer")
                && (rest.is_empty() || rest.starts_with(char::is_whitespace)) =>
        {
            rest.trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Port for enumerating a server's tools.
#[async_trait]
pub trait ToolDiscoveryPort: Send + Sync {
    async fn discover(&self, credentials: &Credentials)
    -> Result<Vec<ToolDescriptor>, DiscoveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("Bearer abc"), "abc");
        assert_eq!(normalize_token("  bearer   abc "), "abc");
        assert_eq!(normalize_token("BEARER abc"), "abc");
        assert_eq!(normalize_token("abc"), "abc");
        assert_eq!(normalize_token("Bearerabc"), "Bearerabc");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("Bearer s3cret", "ent-1", "org-1").unwrap();
        assert_eq!(creds.authorization(), "Bearer s3cret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("ent-1"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            Credentials::new("Bearer ", "e", "o"),
            Err(DiscoveryError::InvalidCredentials(_))
        ));
    }
}
