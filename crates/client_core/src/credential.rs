use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Opaque API key issued by the user service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for empty or whitespace-only values, which mean "unauthenticated".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Durable key-value storage for the credential.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCredentialBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(key.into(), value.into());
        Self {
            values: Mutex::new(values),
        }
    }
}

#[async_trait]
impl CredentialBackend for MemoryCredentialBackend {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores entries as one flat JSON object. Keys other than the one being
/// written are preserved.
pub struct FileCredentialBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read credential file '{}'", self.path.display())
                })
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).with_context(|| {
            format!("credential file '{}' is not a JSON object of strings", self.path.display())
        })
    }
}

#[async_trait]
impl CredentialBackend for FileCredentialBackend {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create credential directory '{}'", parent.display())
            })?;
        }

        let serialized = serde_json::to_vec_pretty(&entries)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serialized)
            .await
            .with_context(|| format!("failed to write '{}'", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("failed to replace '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Holds the live credential and mirrors it into a [`CredentialBackend`].
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    key: String,
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    /// Loads any previously persisted credential.
    pub async fn open(backend: Arc<dyn CredentialBackend>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let current = backend
            .load(&key)
            .await
            .with_context(|| format!("failed to load persisted credential '{key}'"))?
            .and_then(Credential::new);
        debug!(key = %key, restored = current.is_some(), "credential store opened");
        Ok(Self {
            backend,
            key,
            current: RwLock::new(current),
        })
    }

    pub async fn get(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Replaces the live credential, then persists it. The in-memory value is
    /// kept even when persisting fails.
    pub async fn set(&self, credential: Credential) -> Result<()> {
        *self.current.write().await = Some(credential.clone());
        self.backend
            .save(&self.key, credential.expose())
            .await
            .with_context(|| format!("failed to persist credential '{}'", self.key))?;
        info!(key = %self.key, "credential persisted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/credential_tests.rs"]
mod tests;
