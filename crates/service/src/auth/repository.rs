use async_trait::async_trait;

use super::domain::{CredentialRecord, Identity};
use crate::storage::StorageError;

/// Persistence contract for credential records.
///
/// Implementations hold no business rules. Absence is `Ok(None)` / `Ok(false)`;
/// `Err` is reserved for infrastructure faults of the backing storage.
///
/// `insert_if_absent` must be atomic: of any number of concurrent calls for the
/// same identity, exactly one returns `Ok(true)`. A separate `exists` followed
/// by an insert does not satisfy this and must not be relied on for uniqueness.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn exists(&self, identity: &Identity) -> Result<bool, StorageError>;
    async fn insert_if_absent(&self, record: CredentialRecord) -> Result<bool, StorageError>;
    async fn lookup(&self, identity: &Identity) -> Result<Option<CredentialRecord>, StorageError>;
}

/// Process-local store; records are lost when the process exits.
pub mod memory {
    use super::*;
    use dashmap::{mapref::entry::Entry, DashMap};

    #[derive(Default)]
    pub struct InMemoryCredentialStore {
        records: DashMap<Identity, CredentialRecord>,
    }

    impl InMemoryCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.records.len()
        }

        pub fn is_empty(&self) -> bool {
            self.records.is_empty()
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn exists(&self, identity: &Identity) -> Result<bool, StorageError> {
            Ok(self.records.contains_key(identity))
        }

        async fn insert_if_absent(&self, record: CredentialRecord) -> Result<bool, StorageError> {
            // The entry guard holds the shard lock across check and insert.
            match self.records.entry(record.identity.clone()) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    Ok(true)
                }
            }
        }

        async fn lookup(&self, identity: &Identity) -> Result<Option<CredentialRecord>, StorageError> {
            Ok(self.records.get(identity).map(|r| r.value().clone()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::Arc;

        fn record(email: &str, hash: &str) -> CredentialRecord {
            CredentialRecord::new(Identity::parse(email).unwrap(), hash.into(), "test")
        }

        #[tokio::test]
        async fn insert_lookup_exists() {
            let store = InMemoryCredentialStore::new();
            let id = Identity::parse("a@x.com").unwrap();
            assert!(!store.exists(&id).await.unwrap());
            assert!(store.lookup(&id).await.unwrap().is_none());

            assert!(store.insert_if_absent(record("a@x.com", "h1")).await.unwrap());
            assert!(store.exists(&id).await.unwrap());
            assert_eq!(store.lookup(&id).await.unwrap().unwrap().password_hash, "h1");
        }

        #[tokio::test]
        async fn second_insert_does_not_overwrite() {
            let store = InMemoryCredentialStore::new();
            assert!(store.insert_if_absent(record("a@x.com", "first")).await.unwrap());
            assert!(!store.insert_if_absent(record("a@x.com", "second")).await.unwrap());
            let id = Identity::parse("a@x.com").unwrap();
            assert_eq!(store.lookup(&id).await.unwrap().unwrap().password_hash, "first");
            assert_eq!(store.len(), 1);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_inserts_single_winner() {
            let store = Arc::new(InMemoryCredentialStore::new());
            let mut handles = Vec::new();
            for i in 0..64 {
                let store = Arc::clone(&store);
                handles.push(tokio::spawn(async move {
                    store.insert_if_absent(record("race@x.com", &format!("h{i}"))).await.unwrap()
                }));
            }
            let mut wins = 0;
            for h in handles {
                if h.await.unwrap() {
                    wins += 1;
                }
            }
            assert_eq!(wins, 1);
            assert_eq!(store.len(), 1);
        }
    }
}
