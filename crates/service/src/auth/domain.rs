use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message carried by every successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful!";

/// Account identity (an email address). Case-sensitive; used as the store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub const MAX_LEN: usize = 254;

    /// Parse a raw identity, returning a human-readable reason on rejection.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("must not be empty".into());
        }
        if raw.chars().count() > Self::MAX_LEN {
            return Err(format!("must be at most {} characters", Self::MAX_LEN));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err("must not contain whitespace".into());
        }
        match raw.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Self(raw.to_string()))
            }
            _ => Err("must be a well-formed email address".into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plaintext password. Never printed, serialized or stored.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length in Unicode scalar values.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Password {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Length bounds applied to passwords at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8, max_length: 128 }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &Password) -> Result<(), String> {
        let len = password.char_len();
        if len == 0 {
            return Err("must not be empty".into());
        }
        if len < self.min_length {
            return Err(format!("must be at least {} characters", self.min_length));
        }
        if len > self.max_length {
            return Err(format!("must be at most {} characters", self.max_length));
        }
        Ok(())
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    #[serde(alias = "identity")]
    pub email: String,
    pub password: Password,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(alias = "identity")]
    pub email: String,
    pub password: Password,
}

impl RegisterInput {
    pub fn new(email: impl Into<String>, password: impl Into<Password>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<Password>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

/// Stored credential: one per identity, immutable once created.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialRecord {
    pub identity: Identity,
    pub password_hash: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(identity: Identity, password_hash: String, algorithm: impl Into<String>) -> Self {
        Self { identity, password_hash, algorithm: algorithm.into(), created_at: Utc::now() }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("identity", &self.identity)
            .field("password_hash", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Login result (session)
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedSession {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_accepts_plain_email_and_keeps_case() {
        let id = Identity::parse("User@Example.com").unwrap();
        assert_eq!(id.as_str(), "User@Example.com");
        assert_ne!(id, Identity::parse("user@example.com").unwrap());
    }

    #[test]
    fn identity_rejections() {
        assert_eq!(Identity::parse("").unwrap_err(), "must not be empty");
        assert!(Identity::parse("no-at-sign").is_err());
        assert!(Identity::parse("@x.com").is_err());
        assert!(Identity::parse("a@").is_err());
        assert!(Identity::parse("a@b@c").is_err());
        assert!(Identity::parse(" a@x.com").is_err());
        assert!(Identity::parse("a b@x.com").is_err());
        let long = format!("{}@x.com", "a".repeat(Identity::MAX_LEN));
        assert!(Identity::parse(&long).is_err());
    }

    #[test]
    fn password_debug_is_redacted() {
        let p = Password::new("hunter2hunter2");
        assert_eq!(format!("{p:?}"), "Password(***)");
        let input = LoginInput::new("a@x.com", "hunter2hunter2");
        assert!(!format!("{input:?}").contains("hunter2"));
    }

    #[test]
    fn policy_bounds() {
        let policy = PasswordPolicy::default();
        assert!(policy.check(&"password123".into()).is_ok());
        assert!(policy.check(&"short".into()).is_err());
        assert!(policy.check(&"".into()).is_err());
        assert!(policy.check(&"x".repeat(129).as_str().into()).is_err());
        // multi-byte characters count once each
        assert!(policy.check(&"pässwörd".into()).is_ok());
    }

    #[test]
    fn record_debug_hides_hash() {
        let rec = CredentialRecord::new(Identity::parse("a@x.com").unwrap(), "$argon2id$secret".into(), "argon2id");
        assert!(!format!("{rec:?}").contains("secret"));
    }

    #[test]
    fn inputs_accept_identity_alias() {
        let input: RegisterInput =
            serde_json::from_str(r#"{"identity":"a@x.com","password":"password123"}"#).unwrap();
        assert_eq!(input.email, "a@x.com");
        assert_eq!(input.password.expose(), "password123");
    }
}
