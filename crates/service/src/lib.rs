//! Service layer holding the credential-authentication core.
//! - `auth`: registration/login business rules, independent of HTTP.
//! - `storage`: backing-store primitives and their infrastructure errors.

pub mod auth;
pub mod runtime;
pub mod storage;
