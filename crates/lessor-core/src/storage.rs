//! Key/value persistence for configuration records
//!
//! Keys are `/` separated paths such as `dbs/main` or `role/readonly`.
//! Listing a prefix returns its immediate children; children that have
//! further descendants are returned with a trailing `/`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{LessorError, Result};

const FILE_SUFFIX: &str = ".json";

/// Storage collaborator supplied by the host
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// List immediate children of `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Load and decode a JSON record
pub async fn get_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    match storage.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and store a JSON record
pub async fn put_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    storage.put(key, &bytes).await
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(LessorError::Storage(format!("invalid storage key {key:?}")));
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate_key(prefix.trim_end_matches('/'))
}

/// In-process storage, used by tests and embedded hosts
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        validate_prefix(prefix)?;
        let entries = self.entries.read();
        let children: BTreeSet<String> = entries
            .keys()
            .filter_map(|key| key.strip_prefix(prefix))
            .map(|rest| match rest.find('/') {
                Some(idx) => rest[..=idx].to_string(),
                None => rest.to_string(),
            })
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Storage that keeps each key as a JSON file below a root directory
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{FILE_SUFFIX}"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LessorError::Io(e)),
        }
    }

    #[tracing::instrument(skip(self, value), fields(root = %self.root.display()))]
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(LessorError::Io)?;
        }
        tokio::fs::write(&path, value)
            .await
            .map_err(LessorError::Io)?;
        tracing::debug!(bytes = value.len(), "record written");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        validate_prefix(prefix)?;

        // A prefix either names a directory ("dbs/") or a partial file name ("dbs/ma").
        let (dir, stem) = match prefix.rfind('/') {
            Some(idx) => (self.root.join(&prefix[..idx]), &prefix[idx + 1..]),
            None => (self.root.clone(), prefix),
        };

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LessorError::Io(e)),
        };

        let mut children = BTreeSet::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(LessorError::Io)? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(rest) = name.strip_prefix(stem) else {
                continue;
            };
            if entry.file_type().await.map_err(LessorError::Io)?.is_dir() {
                children.insert(format!("{rest}/"));
            } else if let Some(key) = rest.strip_suffix(FILE_SUFFIX) {
                children.insert(key.to_string());
            }
        }
        Ok(children.into_iter().collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LessorError::Io(e)),
        }
    }
}
