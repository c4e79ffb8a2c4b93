use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;

use super::domain::Password;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("malformed password hash: {0}")]
    Malformed(String),
    #[error("hashing failed: {0}")]
    Algorithm(String),
}

/// Pluggable password hashing strategy.
///
/// Implementations must be slow, salted and one-way. `verify` returns
/// `Ok(false)` on mismatch and reserves `Err` for unusable stored hashes.
/// Both calls are CPU-bound; callers run them off the async workers.
pub trait CredentialHasher: Send + Sync + 'static {
    fn algorithm(&self) -> &'static str;
    fn hash(&self, password: &Password) -> Result<String, HashError>;
    fn verify(&self, password: &Password, hash: &str) -> Result<bool, HashError>;
}

/// Argon2id with PHC-encoded output.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self { params: Params::default() }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn algorithm(&self) -> &'static str {
        "argon2id"
    }

    fn hash(&self, password: &Password) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.expose().as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Algorithm(e.to_string()))
    }

    fn verify(&self, password: &Password, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|e| HashError::Malformed(e.to_string()))?;
        // Cost parameters come from the PHC string, not from `self.params`.
        match self.argon2().verify_password(password.expose().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Algorithm(e.to_string())),
        }
    }
}
