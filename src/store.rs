//! Artifact storage.
//!
//! Rendered page images have to outlive the request that produced them: the
//! response only lists their names, and the browser fetches each one
//! afterwards. [`ArtifactStore`] is the key-addressed handoff between the two
//! requests. It is injected into [`crate::convert::Converter`], so the same
//! pipeline runs against process memory ([`MemoryStore`]) or a directory
//! ([`DiskStore`]).
//!
//! **Key format:** `{namespace}/{name}`, where `namespace` is unique per job.
//! Keys are relative, `/`-separated, and may not contain `..`, `.`, empty
//! segments or backslashes.

use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Suffix of in-flight disk writes; never a valid key.
const PARTIAL_SUFFIX: &str = ".part";

/// Key-addressed storage for produced artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous value. Returns the key.
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<String>;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Join a job namespace and an artifact name into a storage key.
pub fn artifact_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Reject keys that could escape the store or collide with in-flight writes.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |why: &str| Err(StoreError::InvalidKey(format!("'{key}': {why}")));

    if key.is_empty() {
        return invalid("empty key");
    }
    if key.starts_with('/') || key.contains('\\') {
        return invalid("must be a relative, '/'-separated path");
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid("empty or relative path segment");
    }
    if key.ends_with(PARTIAL_SUFFIX) {
        return invalid("reserved suffix");
    }
    Ok(())
}

// ── In-memory ────────────────────────────────────────────────────────────

/// Artifacts held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<String> {
        validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), data);
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        validate_key(key)?;
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ── On disk ──────────────────────────────────────────────────────────────

/// Artifacts written below a base directory, one sub-directory per namespace.
#[derive(Debug, Clone)]
pub struct DiskStore {
    base_path: PathBuf,
    /// Keeps a self-provisioned directory alive; removed when the last clone drops.
    _temp_dir: Option<Arc<TempDir>>,
}

impl DiskStore {
    /// Use `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        debug!("Artifact directory: {}", base_path.display());
        Ok(Self {
            base_path,
            _temp_dir: None,
        })
    }

    /// Use a fresh temporary directory, deleted when the store is dropped.
    pub fn temporary() -> StoreResult<Self> {
        let temp_dir = TempDir::new()?;
        debug!("Artifact directory (temporary): {}", temp_dir.path().display());
        Ok(Self {
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: Some(Arc::new(temp_dir)),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl ArtifactStore for DiskStore {
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<String> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling and rename so readers never see half a file.
        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        let written = match fs::write(&partial, &data).await {
            Ok(()) => fs::rename(&partial, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", partial.display(), cleanup);
                }
            }
            return Err(e.into());
        }
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Drop the namespace directory once its last artifact is gone.
        if let Some(parent) = path.parent() {
            if parent != self.base_path {
                let _ = fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}
