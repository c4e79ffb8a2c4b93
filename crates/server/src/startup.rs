use std::{future::Future, path::Path, sync::Arc};

use axum::Router;
use configs::{AppConfig, StorageBackend};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::auth::repository::memory::InMemoryCredentialStore;
use service::auth::{Argon2Hasher, AuthService, CredentialStore, JwtTokenIssuer, PasswordPolicy};
use service::runtime;

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured credential store and assemble the auth service.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let store: Arc<dyn CredentialStore> = match cfg.storage.backend {
        StorageBackend::Memory => {
            warn!("using in-memory credential store; registrations are lost on restart");
            Arc::new(InMemoryCredentialStore::new())
        }
        StorageBackend::File => {
            let store = runtime::open_file_store(Path::new(&cfg.storage.path))
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?;
            Arc::new(store)
        }
    };

    let hasher = Argon2Hasher::new(cfg.hashing.memory_kib, cfg.hashing.iterations, cfg.hashing.parallelism)
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let tokens = JwtTokenIssuer::from_ttl_secs(
        cfg.auth.jwt_secret.as_bytes(),
        cfg.auth.issuer.clone(),
        cfg.auth.token_ttl_secs,
    );
    let policy = PasswordPolicy {
        min_length: cfg.auth.min_password_length,
        max_length: cfg.auth.max_password_length,
    };

    let auth = AuthService::new(store, Arc::new(hasher), Arc::new(tokens)).with_policy(policy);
    auth.warm_up().await.map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    Ok(ServerState::new(auth))
}

/// Router with CORS and tracing layers, ready to serve.
pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

/// Build the app from `cfg` and serve until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = build_state(&cfg).await?;
    let app = build_app(state);

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;
    info!(addr = %listener.local_addr()?, backend = ?cfg.storage.backend, "auth server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("auth server stopped");
    Ok(())
}
