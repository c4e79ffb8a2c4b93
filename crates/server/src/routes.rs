use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::errors::ApiError;
use crate::openapi::ApiDoc;

pub mod auth;

pub const BANNER: &str = "Project Auth-Kit is running!";

pub async fn banner() -> &'static str {
    BANNER
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Build the full application router: public routes, auth endpoints, the
/// protected API and docs, all behind the bearer-token middleware.
pub fn build_router(state: auth::ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/", get(banner))
        .route("/health", get(health));

    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register).fallback(auth::post_only))
        .route("/api/auth/login", post(auth::login).fallback(auth::post_only));

    let api = Router::new().route("/api/me", get(auth::me));

    let docs = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    public
        .merge(auth_routes)
        .merge(api)
        .merge(docs)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
