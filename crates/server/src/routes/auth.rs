use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::warn;

use common::types::MessageBody;
use service::auth::{DynAuthService, LoginInput, RegisterInput, TokenClaims};

use crate::errors::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";
pub const REGISTERED_MESSAGE: &str = "User registered successfully.";

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<DynAuthService>,
}

impl ServerState {
    pub fn new(auth: DynAuthService) -> Self {
        Self { auth: Arc::new(auth) }
    }
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub message: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct MeOutput {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered", body = crate::openapi::MessageResponse), (status = 400, description = "Invalid input or malformed body"), (status = 409, description = "Identity already exists", body = crate::openapi::ErrorResponse), (status = 500, description = "Internal error", body = crate::openapi::ErrorResponse)))]
pub async fn register(
    State(state): State<ServerState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageBody>), ApiError> {
    let Json(input) = payload?;
    state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(MessageBody::new(REGISTERED_MESSAGE))))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in", body = crate::openapi::LoginResponse), (status = 400, description = "Malformed body"), (status = 401, description = "Invalid credentials", body = crate::openapi::ErrorResponse)))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginOutput>), ApiError> {
    let Json(input) = payload?;
    let session = state.auth.authenticate(input).await?;

    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);

    Ok((jar, Json(LoginOutput { message: session.message, token: session.token })))
}

#[utoipa::path(get, path = "/api/me", tag = "auth", responses((status = 200, description = "Current identity", body = crate::openapi::MeResponse), (status = 401, description = "Missing or invalid token", body = crate::openapi::ErrorResponse)))]
pub async fn me(Extension(claims): Extension<TokenClaims>) -> Json<MeOutput> {
    let expires_at = Utc.timestamp_opt(claims.exp, 0).single().unwrap_or_else(Utc::now);
    Json(MeOutput { email: claims.sub, expires_at })
}

/// Fallback for auth routes hit with anything but POST.
pub async fn post_only(method: Method) -> ApiError {
    ApiError::MethodNotAllowed { method: method.to_string(), allowed: "POST" }
}

/// Paths reachable without a token.
pub fn is_public_path(path: &str) -> bool {
    path == "/"
        || path == "/health"
        || path.starts_with("/api/auth/")
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
}

/// Global middleware: outside the public paths and CORS preflight, require
/// `Authorization: Bearer <token>` (or the `auth_token` cookie) and expose the
/// verified claims to handlers as an extension.
pub async fn require_bearer_token(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_owned();
    if is_public_path(&path) || *req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let token = extract_token(req.headers()).map_err(|reason| {
        warn!(%path, reason, "rejecting unauthenticated request");
        ApiError::Unauthorized("Authentication required.")
    })?;

    let claims = state.auth.verify_token(&token).map_err(|_| {
        warn!(%path, "token validation failed");
        ApiError::Unauthorized("Invalid or expired token.")
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn extract_token(headers: &HeaderMap) -> Result<String, &'static str> {
    if let Some(authz) = headers.get(header::AUTHORIZATION) {
        let value = authz.to_str().map_err(|_| "non-ascii Authorization header")?;
        return match value.trim().split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
                Ok(token.trim().to_string())
            }
            _ => Err("invalid Authorization format (expect Bearer)"),
        };
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or("missing Authorization header and auth_token cookie")
}
