//! Placeholder stand-ins for quarantined items.
//!
//! While an item sits in quarantine, a placeholder occupies its original
//! path: a small human-readable JSON note for files, a marker directory
//! for directories. The manager additionally keeps one ledger record per
//! placeholder under its own root, so a restarted process can account
//! for stand-ins a crashed run left behind.
//!
//! Creation is split into `stage` and `activate` to fit ingest's
//! ordering: the note is staged under a hidden name in the original's
//! parent directory while the original still occupies its path, then
//! renamed into place once the original has moved to quarantine. Both
//! steps work on the same filesystem, so activation is a single atomic
//! rename.

use crate::core::error::{PlaceholderError, PlaceholderResult};
use crate::core::types::ItemKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Hidden prefix for staged files. The monitor skips entries carrying
/// it, so half-created placeholders are never detected as new items.
pub(crate) const STAGING_PREFIX: &str = ".fileward-stage-";

const DEFAULT_NOTICE: &str = "Item moved to quarantine pending malware scan; do not modify.";

/// Provenance note stored inside a file placeholder and in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderNote {
    /// Human-readable explanation for whoever finds the placeholder.
    pub notice: String,

    /// Quarantine key of the item this placeholder stands in for.
    pub quarantine_key: String,

    /// The path the placeholder occupies.
    pub original_path: PathBuf,

    /// Whether the displaced item was a file or a directory.
    pub kind: ItemKind,

    /// Size of the displaced file in bytes; absent for directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// When the placeholder was created.
    pub created_at: DateTime<Utc>,
}

impl PlaceholderNote {
    /// Creates a note for the given item.
    pub fn new(
        quarantine_key: impl Into<String>,
        original_path: impl Into<PathBuf>,
        kind: ItemKind,
    ) -> Self {
        Self {
            notice: DEFAULT_NOTICE.to_string(),
            quarantine_key: quarantine_key.into(),
            original_path: original_path.into(),
            kind,
            size_bytes: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the displaced file's size.
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }
}

/// Creates, tracks, and removes placeholders.
///
/// The manager owns the paths it writes: while an item's registry entry
/// exists, its original path belongs to the pipeline and the placeholder
/// there is removed without inspection at disposition time.
#[derive(Debug)]
pub struct PlaceholderManager {
    ledger_root: PathBuf,
}

impl PlaceholderManager {
    /// Opens a manager storing ledger records under the given root,
    /// creating the directory if needed.
    pub fn open(ledger_root: impl Into<PathBuf>) -> PlaceholderResult<Self> {
        let ledger_root = ledger_root.into();
        std::fs::create_dir_all(&ledger_root)
            .map_err(|e| PlaceholderError::create(&ledger_root, e))?;
        Ok(Self { ledger_root })
    }

    /// Returns the ledger directory.
    pub fn ledger_root(&self) -> &Path {
        &self.ledger_root
    }

    fn ledger_path(&self, key: &str) -> PathBuf {
        self.ledger_root.join(format!("{key}.json"))
    }

    fn staging_path(note: &PlaceholderNote) -> PlaceholderResult<PathBuf> {
        let parent = note.original_path.parent().ok_or_else(|| {
            PlaceholderError::create(
                &note.original_path,
                std::io::Error::new(ErrorKind::InvalidInput, "path has no parent directory"),
            )
        })?;
        Ok(parent.join(format!("{STAGING_PREFIX}{}", note.quarantine_key)))
    }

    /// Stages the note under a hidden name next to the original.
    ///
    /// No-op for directories, whose placeholder is created directly by
    /// [`activate`](Self::activate).
    pub async fn stage(&self, note: &PlaceholderNote) -> PlaceholderResult<()> {
        if note.kind.is_directory() {
            return Ok(());
        }
        let staging = Self::staging_path(note)?;
        let write = async {
            let json = serde_json::to_vec_pretty(note)?;
            let mut file = tokio::fs::File::create(&staging).await?;
            file.write_all(&json).await?;
            file.sync_all().await
        };
        write.await.map_err(|e| PlaceholderError::create(&staging, e))
    }

    /// Removes a staged note if present. Used to unwind a failed ingest.
    pub async fn discard_staged(&self, note: &PlaceholderNote) -> PlaceholderResult<()> {
        if note.kind.is_directory() {
            return Ok(());
        }
        let staging = Self::staging_path(note)?;
        match tokio::fs::remove_file(&staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlaceholderError::remove(&staging, e)),
        }
    }

    /// Makes the placeholder visible at the vacated original path and
    /// records the ledger entry.
    ///
    /// Cleans up its own partial effects: if the stand-in cannot be
    /// materialized, the just-written ledger record is removed again.
    pub async fn activate(&self, note: &PlaceholderNote) -> PlaceholderResult<()> {
        let ledger = self.ledger_path(&note.quarantine_key);
        write_json(&ledger, note)
            .await
            .map_err(|e| PlaceholderError::create(&ledger, e))?;

        let result = if note.kind.is_directory() {
            tokio::fs::create_dir(&note.original_path).await
        } else {
            let staging = Self::staging_path(note)?;
            tokio::fs::rename(&staging, &note.original_path).await
        };

        if let Err(e) = result {
            if let Err(cleanup) = self.discard_note(&note.quarantine_key).await {
                tracing::warn!(
                    key = %note.quarantine_key,
                    error = %cleanup,
                    "could not remove ledger record after failed activation"
                );
            }
            return Err(PlaceholderError::create(&note.original_path, e));
        }
        Ok(())
    }

    /// Stages and activates in one step. Used by recovery, where the
    /// original path is already vacant.
    pub async fn place(&self, note: &PlaceholderNote) -> PlaceholderResult<()> {
        self.stage(note).await?;
        if let Err(e) = self.activate(note).await {
            if let Err(cleanup) = self.discard_staged(note).await {
                tracing::warn!(
                    key = %note.quarantine_key,
                    error = %cleanup,
                    "could not remove staged note after failed placement"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Removes the visible stand-in and its ledger record.
    ///
    /// Idempotent: an already-absent stand-in or record is not an error,
    /// so recovery paths can call this without checking first.
    pub async fn remove(
        &self,
        key: &str,
        original_path: &Path,
        kind: ItemKind,
    ) -> PlaceholderResult<()> {
        let result = if kind.is_directory() {
            tokio::fs::remove_dir(original_path).await
        } else {
            tokio::fs::remove_file(original_path).await
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PlaceholderError::remove(original_path, e)),
        }
        self.discard_note(key).await
    }

    /// Removes just the ledger record, tolerating absence.
    pub async fn discard_note(&self, key: &str) -> PlaceholderResult<()> {
        let ledger = self.ledger_path(key);
        match tokio::fs::remove_file(&ledger).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlaceholderError::remove(&ledger, e)),
        }
    }

    /// Loads the ledger record for a key, if one exists.
    pub async fn load_note(&self, key: &str) -> PlaceholderResult<Option<PlaceholderNote>> {
        let ledger = self.ledger_path(key);
        let bytes = match tokio::fs::read(&ledger).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PlaceholderError::note(
                    key,
                    format!("reading ledger record: {e}"),
                ))
            }
        };
        let note = serde_json::from_slice(&bytes)
            .map_err(|e| PlaceholderError::note(key, e.to_string()))?;
        Ok(Some(note))
    }

    /// Re-creates the stand-in at the original path if nothing occupies
    /// it. Returns whether a placeholder was created.
    pub async fn ensure_present(&self, note: &PlaceholderNote) -> PlaceholderResult<bool> {
        match tokio::fs::symlink_metadata(&note.original_path).await {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.place(note).await?;
                Ok(true)
            }
            Err(e) => Err(PlaceholderError::create(&note.original_path, e)),
        }
    }
}

/// Writes pretty JSON durably: staged sibling, fsync, atomic rename.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
    let json = serde_json::to_vec_pretty(value)?;
    let staging = staged_sibling(path)?;
    let mut file = tokio::fs::File::create(&staging).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&staging, path).await
}

fn staged_sibling(path: &Path) -> Result<PathBuf, std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(ErrorKind::InvalidInput, "path has no file name")
    })?;
    Ok(parent.join(format!("{STAGING_PREFIX}{}", name.to_string_lossy())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_note(dir: &Path, key: &str, name: &str) -> PlaceholderNote {
        PlaceholderNote::new(key, dir.join(name), ItemKind::File).with_size(42)
    }

    #[tokio::test]
    async fn stage_then_activate_materializes_file_placeholder() {
        let watch = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let manager = PlaceholderManager::open(ledger.path()).unwrap();

        let note = file_note(watch.path(), "20240101T000000.000_doc.pdf", "doc.pdf");
        manager.stage(&note).await.unwrap();

        // Staged under the hidden prefix, not yet at the original path.
        assert!(watch
            .path()
            .join(format!("{STAGING_PREFIX}20240101T000000.000_doc.pdf"))
            .exists());
        assert!(!note.original_path.exists());

        manager.activate(&note).await.unwrap();
        assert!(note.original_path.exists());

        // The visible placeholder carries the note itself.
        let content = std::fs::read_to_string(&note.original_path).unwrap();
        let parsed: PlaceholderNote = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.quarantine_key, note.quarantine_key);
        assert_eq!(parsed.size_bytes, Some(42));

        // And the ledger holds the same record.
        let loaded = manager
            .load_note("20240101T000000.000_doc.pdf")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.original_path, note.original_path);
    }

    #[tokio::test]
    async fn directory_placeholder_is_marker_directory() {
        let watch = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let manager = PlaceholderManager::open(ledger.path()).unwrap();

        let note = PlaceholderNote::new(
            "20240101T000000.000_bundle",
            watch.path().join("bundle"),
            ItemKind::Directory,
        );
        manager.stage(&note).await.unwrap();
        manager.activate(&note).await.unwrap();

        let meta = std::fs::metadata(&note.original_path).unwrap();
        assert!(meta.is_dir());
        assert!(manager
            .load_note("20240101T000000.000_bundle")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn remove_clears_standin_and_ledger() {
        let watch = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let manager = PlaceholderManager::open(ledger.path()).unwrap();

        let note = file_note(watch.path(), "key1", "a.bin");
        manager.place(&note).await.unwrap();
        assert!(note.original_path.exists());

        manager
            .remove("key1", &note.original_path, ItemKind::File)
            .await
            .unwrap();
        assert!(!note.original_path.exists());
        assert!(manager.load_note("key1").await.unwrap().is_none());

        // Idempotent.
        manager
            .remove("key1", &note.original_path, ItemKind::File)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_present_recreates_missing_standin() {
        let watch = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let manager = PlaceholderManager::open(ledger.path()).unwrap();

        let note = file_note(watch.path(), "key2", "b.bin");
        assert!(manager.ensure_present(&note).await.unwrap());
        assert!(note.original_path.exists());

        // Second call sees the stand-in and does nothing.
        assert!(!manager.ensure_present(&note).await.unwrap());
    }

    #[tokio::test]
    async fn discard_staged_unwinds_partial_ingest() {
        let watch = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let manager = PlaceholderManager::open(ledger.path()).unwrap();

        let note = file_note(watch.path(), "key3", "c.bin");
        manager.stage(&note).await.unwrap();
        manager.discard_staged(&note).await.unwrap();

        assert_eq!(std::fs::read_dir(watch.path()).unwrap().count(), 0);
        // Tolerates a second discard.
        manager.discard_staged(&note).await.unwrap();
    }
}
