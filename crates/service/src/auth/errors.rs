use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::hasher::HashError;
use super::token::TokenError;
use crate::storage::StorageError;

/// Field name → reason, collected across every failing field of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errs = Self::new();
        errs.add(field, reason);
        errs
    }

    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.insert(field.into(), reason.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reason) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field} {reason}")?;
            first = false;
        }
        Ok(())
    }
}

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    InvalidInput(FieldErrors),
    #[error("user with email {0} already exists")]
    IdentityAlreadyExists(String),
    /// Shared by "unknown identity" and "wrong password".
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::InvalidInput(_) => 1001,
            AuthError::IdentityAlreadyExists(_) => 1002,
            AuthError::InvalidCredentials => 1004,
            AuthError::Internal(_) => 1100,
            AuthError::StorageFailure(_) => 1200,
        }
    }

    /// Expected outcomes of normal operation, as opposed to infrastructure faults.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidInput(_) | AuthError::IdentityAlreadyExists(_) | AuthError::InvalidCredentials
        )
    }
}

impl From<HashError> for AuthError {
    fn from(e: HashError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::Internal(e.to_string())
    }
}
