//! Runtime environment helpers
//!
//! Keeps binary crates opening stores through `service::runtime` without
//! depending directly on `common::env`.

use std::path::Path;

use tracing::info;

use crate::auth::repo::JsonFileCredentialStore;

/// Ensure the data directory exists, then open the file-backed credential store.
pub async fn open_file_store(path: &Path) -> anyhow::Result<JsonFileCredentialStore> {
    common::env::ensure_data_dir(path).await?;
    let store = JsonFileCredentialStore::open(path).await?;
    let records = store.len().await;
    info!(path = %store.path().display(), records, "credential store opened");
    Ok(store)
}
