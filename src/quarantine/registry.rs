//! Durable quarantine-key-to-original-path registry.
//!
//! The registry is the pipeline's crash-recovery anchor: an entry exists
//! exactly while its item resides in quarantine awaiting or undergoing
//! disposition, and records where the item must be restored to. The
//! persisted form is one JSON object, fully rewritten on every mutation
//! through a staged sibling file, fsync, and atomic rename, so the
//! on-disk document is always a complete snapshot of some past state.

use crate::core::error::{RegistryError, RegistryResult};
use crate::quarantine::placeholder::STAGING_PREFIX;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Durable `{quarantine_key → original path}` mapping.
///
/// All read-modify-write access is serialized through one async mutex
/// owning the in-memory map; a mutation that cannot be persisted is
/// rolled back in memory, so the map never runs ahead of the file.
#[derive(Debug)]
pub struct PathRegistry {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, PathBuf>>,
}

impl PathRegistry {
    /// Opens the registry at the given file path, loading any existing
    /// document. A missing file starts an empty registry; a present but
    /// undecodable file is an error rather than silent data loss.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| RegistryError::load(&path, e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(RegistryError::Io(e)),
        };

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "opened path registry"
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Returns the registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts an entry and persists the updated document.
    pub async fn insert(
        &self,
        key: impl Into<String>,
        original_path: impl Into<PathBuf>,
    ) -> RegistryResult<()> {
        let key = key.into();
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.clone(), original_path.into());
        if let Err(err) = persist(&self.path, &entries).await {
            match previous {
                Some(path) => entries.insert(key, path),
                None => entries.remove(&key),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Removes an entry and persists the updated document. Returns the
    /// original path the entry recorded, if it existed.
    pub async fn remove(&self, key: &str) -> RegistryResult<Option<PathBuf>> {
        let mut entries = self.entries.lock().await;
        let Some(previous) = entries.remove(key) else {
            return Ok(None);
        };
        if let Err(err) = persist(&self.path, &entries).await {
            entries.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(Some(previous))
    }

    /// Returns the original path recorded for a key.
    pub async fn get(&self, key: &str) -> Option<PathBuf> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Returns whether an entry exists for the key.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Returns a snapshot of all entries.
    pub async fn entries(&self) -> BTreeMap<String, PathBuf> {
        self.entries.lock().await.clone()
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns whether the registry has no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Rewrites the document durably: staged sibling, fsync, rename, and on
/// Unix an fsync of the containing directory so the rename itself is
/// durable.
async fn persist(path: &Path, entries: &BTreeMap<String, PathBuf>) -> RegistryResult<()> {
    let json =
        serde_json::to_vec_pretty(entries).map_err(|e| RegistryError::persist(path, e.into()))?;

    let parent = path.parent().ok_or_else(|| {
        RegistryError::persist(
            path,
            std::io::Error::new(ErrorKind::InvalidInput, "registry path has no parent"),
        )
    })?;
    let name = path.file_name().ok_or_else(|| {
        RegistryError::persist(
            path,
            std::io::Error::new(ErrorKind::InvalidInput, "registry path has no file name"),
        )
    })?;
    let staging = parent.join(format!("{STAGING_PREFIX}{}", name.to_string_lossy()));

    let write = async {
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, path).await?;

        #[cfg(unix)]
        std::fs::File::open(parent)?.sync_all()?;

        Ok::<(), std::io::Error>(())
    };
    write.await.map_err(|e| RegistryError::persist(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PathRegistry::open(dir.path().join("registry.json")).unwrap();

        registry.insert("key-a", "/watch/a.bin").await.unwrap();
        registry.insert("key-b", "/watch/b.bin").await.unwrap();

        assert!(registry.contains("key-a").await);
        assert_eq!(
            registry.get("key-a").await,
            Some(PathBuf::from("/watch/a.bin"))
        );
        assert_eq!(registry.len().await, 2);

        let removed = registry.remove("key-a").await.unwrap();
        assert_eq!(removed, Some(PathBuf::from("/watch/a.bin")));
        assert!(!registry.contains("key-a").await);
        assert_eq!(registry.remove("key-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        {
            let registry = PathRegistry::open(&path).unwrap();
            registry.insert("key-a", "/watch/a.bin").await.unwrap();
            registry.insert("key-b", "/watch/b.bin").await.unwrap();
            registry.remove("key-b").await.unwrap();
        }

        let reopened = PathRegistry::open(&path).unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(
            reopened.get("key-a").await,
            Some(PathBuf::from("/watch/a.bin"))
        );
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PathRegistry::open(dir.path().join("absent.json")).unwrap();
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = PathRegistry::open(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Load { .. }));
    }

    #[tokio::test]
    async fn no_staging_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let registry = PathRegistry::open(&path).unwrap();
        registry.insert("key-a", "/watch/a.bin").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["registry.json".to_string()]);
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_memory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("store");
        std::fs::create_dir(&sub).unwrap();
        let registry = PathRegistry::open(sub.join("registry.json")).unwrap();
        registry.insert("key-a", "/watch/a.bin").await.unwrap();

        // Remove the containing directory so the staged write fails.
        std::fs::remove_dir_all(&sub).unwrap();
        let err = registry.insert("key-b", "/watch/b.bin").await.unwrap_err();
        assert!(matches!(err, RegistryError::Persist { .. }));

        // The in-memory map did not run ahead: key-b was rolled back.
        assert!(!registry.contains("key-b").await);
        assert!(registry.contains("key-a").await);
        assert_eq!(registry.len().await, 1);
    }
}
