use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::auth::domain::{CredentialRecord, Identity};
use crate::auth::repository::CredentialStore;
use crate::storage::{JsonMapStore, StorageError};

/// Credential store persisted as a JSON object keyed by identity.
pub struct JsonFileCredentialStore {
    inner: JsonMapStore<Identity, CredentialRecord>,
}

impl JsonFileCredentialStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StorageError> {
        Ok(Self { inner: JsonMapStore::open(path).await? })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl CredentialStore for JsonFileCredentialStore {
    async fn exists(&self, identity: &Identity) -> Result<bool, StorageError> {
        Ok(self.inner.contains_key(identity).await)
    }

    async fn insert_if_absent(&self, record: CredentialRecord) -> Result<bool, StorageError> {
        self.inner.insert_if_absent(record.identity.clone(), record).await
    }

    async fn lookup(&self, identity: &Identity) -> Result<Option<CredentialRecord>, StorageError> {
        Ok(self.inner.get(identity).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_file() -> PathBuf {
        std::env::temp_dir().join(format!("credentials_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn records_survive_reopen() -> Result<(), anyhow::Error> {
        let path = temp_file();
        let id = Identity::parse("persist@x.com").unwrap();
        {
            let store = JsonFileCredentialStore::open(&path).await?;
            let rec = CredentialRecord::new(id.clone(), "$argon2id$stub".into(), "argon2id");
            assert!(store.insert_if_absent(rec).await?);
        }

        let reopened = JsonFileCredentialStore::open(&path).await?;
        assert!(reopened.exists(&id).await?);
        let rec = reopened.lookup(&id).await?.expect("record persisted");
        assert_eq!(rec.password_hash, "$argon2id$stub");
        assert_eq!(rec.algorithm, "argon2id");

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_single_winner() -> Result<(), anyhow::Error> {
        let path = temp_file();
        let store = Arc::new(JsonFileCredentialStore::open(&path).await?);
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let rec = CredentialRecord::new(Identity::parse("race@x.com").unwrap(), format!("h{i}"), "test");
                store.insert_if_absent(rec).await
            }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await?? {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.len().await, 1);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }
}
