use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::domain::{
    AuthenticatedSession, CredentialRecord, Identity, LoginInput, Password, PasswordPolicy, RegisterInput,
    LOGIN_SUCCESS_MESSAGE,
};
use super::errors::{AuthError, FieldErrors};
use super::hasher::CredentialHasher;
use super::repository::CredentialStore;
use super::token::{TokenClaims, TokenIssuer};

/// Auth business service independent of web framework.
///
/// Stateless between calls: every record lives in the store, and the hasher
/// and token issuer are read-only after construction, so one instance is
/// shared across all requests.
pub struct AuthService<S: CredentialStore + ?Sized> {
    store: Arc<S>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    policy: PasswordPolicy,
    // Verified against when the identity is unknown, so every rejected login
    // costs one hash verification.
    dummy_hash: OnceCell<String>,
}

const DUMMY_PASSWORD: &str = "authkit-dummy-password";

/// Service over a type-erased store, as held by the HTTP layer.
pub type DynAuthService = AuthService<dyn CredentialStore>;

impl<S: CredentialStore + ?Sized> AuthService<S> {
    pub fn new(store: Arc<S>, hasher: Arc<dyn CredentialHasher>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { store, hasher, tokens, policy: PasswordPolicy::default(), dummy_hash: OnceCell::new() }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Compute the dummy hash up front so the first unknown-identity login
    /// does not pay for an extra hash.
    pub async fn warm_up(&self) -> Result<(), AuthError> {
        self.dummy_hash().await.map(|_| ())
    }

    /// Register a new identity with a hashed password.
    ///
    /// The `exists` pre-check only saves a hash computation for obvious
    /// duplicates; uniqueness is decided by `insert_if_absent`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{Argon2Hasher, AuthError, AuthService, JwtTokenIssuer, RegisterInput};
    /// use service::auth::repository::memory::InMemoryCredentialStore;
    ///
    /// let svc = AuthService::new(
    ///     Arc::new(InMemoryCredentialStore::new()),
    ///     Arc::new(Argon2Hasher::new(8, 1, 1).unwrap()),
    ///     Arc::new(JwtTokenIssuer::from_ttl_secs(b"doc-secret", "authkit", 60)),
    /// );
    /// tokio_test::block_on(svc.register(RegisterInput::new("user@example.com", "Secret123"))).unwrap();
    /// let again = tokio_test::block_on(svc.register(RegisterInput::new("user@example.com", "Other456")));
    /// assert!(matches!(again, Err(AuthError::IdentityAlreadyExists(_))));
    /// ```
    #[instrument(skip(self, input), fields(identity = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<(), AuthError> {
        let identity = self.validate_registration(&input)?;

        if self.store.exists(&identity).await? {
            warn!(event = "register_conflict", "identity already registered");
            return Err(AuthError::IdentityAlreadyExists(identity.into_string()));
        }

        let password_hash = self.hash(input.password).await?;
        let record = CredentialRecord::new(identity.clone(), password_hash, self.hasher.algorithm());

        if !self.store.insert_if_absent(record).await? {
            warn!(event = "register_conflict", "identity registered concurrently");
            return Err(AuthError::IdentityAlreadyExists(identity.into_string()));
        }

        info!(event = "user_registered", algorithm = self.hasher.algorithm(), "user registered");
        Ok(())
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown identity, malformed identity and wrong password all yield the
    /// same `InvalidCredentials`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{Argon2Hasher, AuthService, JwtTokenIssuer, LoginInput, RegisterInput};
    /// use service::auth::repository::memory::InMemoryCredentialStore;
    ///
    /// let svc = AuthService::new(
    ///     Arc::new(InMemoryCredentialStore::new()),
    ///     Arc::new(Argon2Hasher::new(8, 1, 1).unwrap()),
    ///     Arc::new(JwtTokenIssuer::from_ttl_secs(b"doc-secret", "authkit", 60)),
    /// );
    /// tokio_test::block_on(svc.register(RegisterInput::new("u@e.com", "Passw0rd!"))).unwrap();
    /// let session = tokio_test::block_on(svc.authenticate(LoginInput::new("u@e.com", "Passw0rd!"))).unwrap();
    /// assert_eq!(session.identity.as_str(), "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(identity = %input.email))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<AuthenticatedSession, AuthError> {
        let Ok(identity) = Identity::parse(&input.email) else {
            debug!("login rejected: malformed identity");
            return self.reject_unknown(input.password).await;
        };

        let Some(record) = self.store.lookup(&identity).await? else {
            debug!("login rejected: unknown identity");
            return self.reject_unknown(input.password).await;
        };

        if !self.verify(input.password, record.password_hash).await? {
            debug!("login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&identity)?;
        info!(event = "login_succeeded", expires_at = %issued.expires_at, "user authenticated");

        Ok(AuthenticatedSession {
            identity,
            token: issued.token,
            expires_at: issued.expires_at,
            message: LOGIN_SUCCESS_MESSAGE.to_string(),
        })
    }

    /// Check a bearer token; every rejection reason maps to `InvalidCredentials`.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::InvalidCredentials
        })
    }

    fn validate_registration(&self, input: &RegisterInput) -> Result<Identity, AuthError> {
        let mut errors = FieldErrors::new();
        let identity = Identity::parse(&input.email)
            .map_err(|reason| errors.add("email", reason))
            .ok();
        if let Err(reason) = self.policy.check(&input.password) {
            errors.add("password", reason);
        }
        match identity {
            Some(identity) if errors.is_empty() => Ok(identity),
            _ => {
                debug!(fields = %errors, "registration input rejected");
                Err(AuthError::InvalidInput(errors))
            }
        }
    }

    async fn dummy_hash(&self) -> Result<&String, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash(Password::new(DUMMY_PASSWORD)))
            .await
    }

    /// Spend one verification on the dummy hash, then fail like a wrong password.
    async fn reject_unknown<T>(&self, password: Password) -> Result<T, AuthError> {
        let dummy = self.dummy_hash().await?.clone();
        self.verify(password, dummy).await?;
        Err(AuthError::InvalidCredentials)
    }

    async fn hash(&self, password: Password) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
            .map_err(AuthError::from)
    }

    async fn verify(&self, password: Password, password_hash: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?
            .map_err(AuthError::from)
    }
}
