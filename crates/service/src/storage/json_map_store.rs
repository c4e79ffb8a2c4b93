use std::{
    collections::HashMap,
    ffi::OsString,
    hash::Hash,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::RwLock};
use tracing::{debug, info};

use super::StorageError;

/// JSON file-backed key-value map.
///
/// The whole map lives in memory behind a `RwLock` and is rewritten to disk on
/// every successful insert. Writes go to a sibling `.tmp` file which is then
/// renamed over the target, so a crash mid-write never truncates the store.
pub struct JsonMapStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
    file_path: PathBuf,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Open the store at `path`, creating an empty file when missing.
    ///
    /// An unreadable or unparsable file is an error; it is never replaced.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StorageError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let map: HashMap<K, V> = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: file_path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty = HashMap::new();
                persist(&file_path, &empty).await?;
                info!(path = %file_path.display(), "created empty store file");
                empty
            }
            Err(e) => return Err(StorageError::io(&file_path, e)),
        };
        debug!(path = %file_path.display(), entries = map.len(), "store loaded");

        Ok(Self { inner: RwLock::new(map), file_path })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.inner.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Insert `value` only if `key` is absent, persisting before returning.
    ///
    /// The write lock is held across check, insert and persist. If persisting
    /// fails the insert is rolled back, so the map never holds an entry that
    /// is not on disk.
    pub async fn insert_if_absent(&self, key: K, value: V) -> Result<bool, StorageError> {
        let mut map = self.inner.write().await;
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key.clone(), value);
        if let Err(e) = persist(&self.file_path, &map).await {
            map.remove(&key);
            return Err(e);
        }
        Ok(true)
    }
}

async fn persist<K, V>(path: &Path, map: &HashMap<K, V>) -> Result<(), StorageError>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
{
    let data = serde_json::to_vec_pretty(map)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, data).await.map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).await.map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".tmp");
    PathBuf::from(s)
}
