//! Auth module: domain types, credential store contract and backends,
//! hashing strategy, token issuer, and the registration/login service.
//!
//! Nothing here depends on the web framework; the server crate only maps
//! inputs in and [`AuthError`] kinds out.

pub mod domain;
pub mod errors;
pub mod hasher;
pub mod repo;
pub mod repository;
pub mod service;
pub mod token;

pub use domain::{
    AuthenticatedSession, CredentialRecord, Identity, LoginInput, Password, PasswordPolicy, RegisterInput,
};
pub use errors::{AuthError, FieldErrors};
pub use hasher::{Argon2Hasher, CredentialHasher, HashError};
pub use repository::CredentialStore;
pub use service::{AuthService, DynAuthService};
pub use token::{IssuedToken, JwtTokenIssuer, TokenClaims, TokenError, TokenIssuer};
