//! Relocation of detected items into quarantine.
//!
//! Ingest is the only writer that moves items off the watched directory.
//! Its effect sequence is ordered so that every failure can be unwound:
//! stage the placeholder note, rename the item into quarantine, activate
//! the placeholder, record the registry entry, hash the quarantined
//! contents. A failure at any step rolls the earlier steps back in
//! reverse, leaving the watched directory exactly as it was found;
//! rollback failures are logged loudly while the original error is
//! returned.

use crate::core::error::{IngestError, IngestResult};
use crate::core::hasher::ContentHasher;
use crate::core::types::{Item, ItemKind, ItemStatus};
use crate::quarantine::metadata::MetadataStore;
use crate::quarantine::placeholder::{PlaceholderManager, PlaceholderNote};
use crate::quarantine::registry::PathRegistry;

use chrono::Utc;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_KEY_ATTEMPTS: u32 = 100;

/// Moves detected entries into quarantine and returns populated items.
#[derive(Debug)]
pub struct Ingestor {
    quarantine_root: PathBuf,
    placeholders: Arc<PlaceholderManager>,
    registry: Arc<PathRegistry>,
    metadata: MetadataStore,
    hasher: ContentHasher,
}

impl Ingestor {
    /// Creates an ingestor storing items under the given quarantine root.
    pub fn new(
        quarantine_root: impl Into<PathBuf>,
        placeholders: Arc<PlaceholderManager>,
        registry: Arc<PathRegistry>,
        metadata: MetadataStore,
    ) -> Self {
        Self {
            quarantine_root: quarantine_root.into(),
            placeholders,
            registry,
            metadata,
            hasher: ContentHasher::new(),
        }
    }

    /// Replaces the content hasher (for example to enable SHA-256).
    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Quarantines the entry at `source`.
    ///
    /// On success the entry has been renamed into quarantine storage, a
    /// placeholder occupies its original path, the registry records the
    /// way back, and the returned item carries the content hash of the
    /// quarantined bytes with status [`ItemStatus::Moved`].
    ///
    /// The rename never crosses filesystems and never falls back to a
    /// copy: the quarantine root must live on the same device as the
    /// watched directory, or every ingest fails with
    /// [`IngestError::Relocation`].
    pub async fn ingest(&self, source: &Path) -> IngestResult<Item> {
        let detected_at = Utc::now();

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| IngestError::invalid_source(source, "path has no file name"))?;

        let meta = match tokio::fs::symlink_metadata(source).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(IngestError::source_vanished(source));
            }
            Err(e) => return Err(IngestError::invalid_source(source, e.to_string())),
        };
        let kind = if meta.is_dir() {
            ItemKind::Directory
        } else {
            ItemKind::File
        };

        let key = self.allocate_key(&name).await?;
        let quarantine_path = self.quarantine_root.join(&key);

        let mut note = PlaceholderNote::new(&key, source, kind);
        if kind == ItemKind::File {
            note = note.with_size(meta.len());
        }

        // Stage the note while the original still occupies its path, so
        // activation later is a same-directory rename.
        self.placeholders.stage(&note).await?;

        if let Err(e) = tokio::fs::rename(source, &quarantine_path).await {
            self.unwind_staged(&note).await;
            return Err(if e.kind() == ErrorKind::NotFound {
                IngestError::source_vanished(source)
            } else {
                IngestError::relocation(source, &quarantine_path, e)
            });
        }

        if let Err(e) = self.placeholders.activate(&note).await {
            self.unwind_relocation(&quarantine_path, source).await;
            self.unwind_staged(&note).await;
            return Err(e.into());
        }

        if let Err(e) = self.registry.insert(&key, source).await {
            self.unwind_placeholder(&note).await;
            self.unwind_relocation(&quarantine_path, source).await;
            return Err(e.into());
        }

        let hash = {
            let hasher = self.hasher.clone();
            let target = quarantine_path.clone();
            match tokio::task::spawn_blocking(move || hasher.hash_path(&target)).await {
                Ok(Ok(hash)) => hash,
                Ok(Err(e)) => {
                    self.unwind_registry(&key).await;
                    self.unwind_placeholder(&note).await;
                    self.unwind_relocation(&quarantine_path, source).await;
                    return Err(IngestError::hashing(&quarantine_path, e));
                }
                Err(join) => {
                    self.unwind_registry(&key).await;
                    self.unwind_placeholder(&note).await;
                    self.unwind_relocation(&quarantine_path, source).await;
                    return Err(IngestError::hashing(
                        &quarantine_path,
                        std::io::Error::new(ErrorKind::Other, join.to_string()),
                    ));
                }
            }
        };

        tracing::debug!(
            key = %key,
            source = %source.display(),
            kind = %kind,
            hash = %hash,
            "item ingested into quarantine"
        );

        Ok(Item {
            id: uuid::Uuid::new_v4().to_string(),
            quarantine_key: key,
            original_path: source.to_path_buf(),
            quarantine_path,
            kind,
            content_hash: hash,
            status: ItemStatus::Moved,
            engine_verdicts: BTreeMap::new(),
            detected_at,
            scanned_at: None,
        })
    }

    /// Allocates a timestamped key that collides with nothing live: no
    /// registry entry, no occupied quarantine slot, no existing audit
    /// record. Collisions retry with a numeric suffix.
    async fn allocate_key(&self, name: &str) -> IngestResult<String> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let base = format!("{stamp}_{name}");
        for attempt in 0..MAX_KEY_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            if self.key_free(&candidate).await {
                return Ok(candidate);
            }
        }
        Err(IngestError::key_allocation(name, MAX_KEY_ATTEMPTS))
    }

    /// A key is free only when every probe confirms absence; a probe
    /// that cannot be answered counts as occupied.
    async fn key_free(&self, key: &str) -> bool {
        if self.registry.contains(key).await {
            return false;
        }
        for path in [
            self.quarantine_root.join(key),
            self.metadata.record_path(key),
        ] {
            match tokio::fs::symlink_metadata(&path).await {
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                _ => return false,
            }
        }
        true
    }

    async fn unwind_staged(&self, note: &PlaceholderNote) {
        if let Err(err) = self.placeholders.discard_staged(note).await {
            tracing::error!(
                key = %note.quarantine_key,
                error = %err,
                "ingest rollback: staged placeholder note not removed"
            );
        }
    }

    async fn unwind_placeholder(&self, note: &PlaceholderNote) {
        if let Err(err) = self
            .placeholders
            .remove(&note.quarantine_key, &note.original_path, note.kind)
            .await
        {
            tracing::error!(
                key = %note.quarantine_key,
                error = %err,
                "ingest rollback: placeholder not removed"
            );
        }
    }

    async fn unwind_relocation(&self, quarantine_path: &Path, source: &Path) {
        if let Err(err) = tokio::fs::rename(quarantine_path, source).await {
            tracing::error!(
                from = %quarantine_path.display(),
                to = %source.display(),
                error = %err,
                "ingest rollback: item stranded in quarantine"
            );
        }
    }

    async fn unwind_registry(&self, key: &str) {
        if let Err(err) = self.registry.remove(key).await {
            tracing::error!(
                key = %key,
                error = %err,
                "ingest rollback: registry entry not removed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        watch: TempDir,
        storage: TempDir,
        ledger: TempDir,
        _registry_dir: TempDir,
        ingestor: Ingestor,
        registry: Arc<PathRegistry>,
    }

    fn fixture() -> Fixture {
        let watch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let ledger = TempDir::new().unwrap();
        let registry_dir = TempDir::new().unwrap();

        let placeholders = Arc::new(PlaceholderManager::open(ledger.path()).unwrap());
        let registry =
            Arc::new(PathRegistry::open(registry_dir.path().join("registry.json")).unwrap());
        let metadata = MetadataStore::new(storage.path());
        let ingestor = Ingestor::new(
            storage.path(),
            placeholders,
            Arc::clone(&registry),
            metadata,
        );

        Fixture {
            watch,
            storage,
            ledger,
            _registry_dir: registry_dir,
            ingestor,
            registry,
        }
    }

    fn dir_entries(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(path)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn ingest_file_relocates_and_placeholds() {
        let fx = fixture();
        let source = fx.watch.path().join("report.pdf");
        std::fs::write(&source, b"pdf bytes").unwrap();

        let item = fx.ingestor.ingest(&source).await.unwrap();

        assert_eq!(item.status, ItemStatus::Moved);
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.original_path, source);
        assert!(item.quarantine_key.ends_with("_report.pdf"));
        assert!(item.engine_verdicts.is_empty());

        // Contents moved, hash computed over the quarantined bytes.
        assert_eq!(std::fs::read(&item.quarantine_path).unwrap(), b"pdf bytes");
        assert_eq!(
            item.content_hash,
            ContentHasher::new().hash_bytes(b"pdf bytes")
        );

        // A placeholder note occupies the original path.
        let note: PlaceholderNote =
            serde_json::from_str(&std::fs::read_to_string(&source).unwrap()).unwrap();
        assert_eq!(note.quarantine_key, item.quarantine_key);
        assert_eq!(note.size_bytes, Some(9));

        // Registry records the way back.
        assert_eq!(fx.registry.get(&item.quarantine_key).await, Some(source));
    }

    #[tokio::test]
    async fn ingest_directory_as_one_item() {
        let fx = fixture();
        let source = fx.watch.path().join("bundle");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("inner.txt"), b"inner").unwrap();

        let item = fx.ingestor.ingest(&source).await.unwrap();

        assert_eq!(item.kind, ItemKind::Directory);
        assert!(item.quarantine_path.join("inner.txt").exists());

        // The placeholder is an empty marker directory.
        let meta = std::fs::metadata(&source).unwrap();
        assert!(meta.is_dir());
        assert_eq!(dir_entries(&source), Vec::<String>::new());

        // Directory digest is stable across the relocation.
        assert_eq!(
            item.content_hash,
            ContentHasher::new().hash_dir(&item.quarantine_path).unwrap()
        );
    }

    #[tokio::test]
    async fn vanished_source_leaves_no_artifacts() {
        let fx = fixture();
        let ghost = fx.watch.path().join("never-existed.bin");

        let err = fx.ingestor.ingest(&ghost).await.unwrap_err();
        assert!(matches!(err, IngestError::SourceVanished { .. }));

        assert_eq!(dir_entries(fx.watch.path()), Vec::<String>::new());
        assert_eq!(dir_entries(fx.storage.path()), Vec::<String>::new());
        assert_eq!(dir_entries(fx.ledger.path()), Vec::<String>::new());
        assert!(fx.registry.is_empty().await);
    }

    #[tokio::test]
    async fn key_probes_see_registry_storage_and_records() {
        let fx = fixture();

        fx.registry.insert("taken-by-registry", "/x").await.unwrap();
        std::fs::write(fx.storage.path().join("taken-by-slot"), b"x").unwrap();
        std::fs::write(
            fx.storage.path().join("taken-by-record.metadata.json"),
            b"{}",
        )
        .unwrap();

        assert!(!fx.ingestor.key_free("taken-by-registry").await);
        assert!(!fx.ingestor.key_free("taken-by-slot").await);
        assert!(!fx.ingestor.key_free("taken-by-record").await);
        assert!(fx.ingestor.key_free("genuinely-free").await);
    }

    #[tokio::test]
    async fn sequential_ingests_of_same_name_get_distinct_keys() {
        let fx = fixture();

        let source = fx.watch.path().join("dup.bin");
        std::fs::write(&source, b"first").unwrap();
        let first = fx.ingestor.ingest(&source).await.unwrap();

        std::fs::remove_file(&source).ok();
        std::fs::write(&source, b"second").unwrap();
        let second = fx.ingestor.ingest(&source).await.unwrap();

        assert_ne!(first.quarantine_key, second.quarantine_key);
        assert_eq!(fx.registry.len().await, 2);
    }

    #[tokio::test]
    async fn failed_registry_insert_rolls_everything_back() {
        let watch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let ledger = TempDir::new().unwrap();
        let registry_dir = TempDir::new().unwrap();

        let placeholders = Arc::new(PlaceholderManager::open(ledger.path()).unwrap());
        // The registry file's parent directory never exists, so every
        // persist fails while open (a plain read) succeeds.
        let registry = Arc::new(
            PathRegistry::open(registry_dir.path().join("missing").join("registry.json")).unwrap(),
        );
        let metadata = MetadataStore::new(storage.path());
        let ingestor = Ingestor::new(
            storage.path(),
            placeholders,
            Arc::clone(&registry),
            metadata,
        );

        let source = watch.path().join("doomed.bin");
        std::fs::write(&source, b"payload").unwrap();

        let err = ingestor.ingest(&source).await.unwrap_err();
        assert!(matches!(err, IngestError::Registry(_)));

        // The watched directory is exactly as it was found.
        assert_eq!(std::fs::read(&source).unwrap(), b"payload");
        assert_eq!(dir_entries(watch.path()), vec!["doomed.bin".to_string()]);
        assert_eq!(dir_entries(storage.path()), Vec::<String>::new());
        assert_eq!(dir_entries(ledger.path()), Vec::<String>::new());
        assert!(registry.is_empty().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_hash_rolls_everything_back() {
        let fx = fixture();

        // A dangling symlink ingests as a file but cannot be hashed.
        let source = fx.watch.path().join("dangling");
        std::os::unix::fs::symlink("/nonexistent/target", &source).unwrap();

        let err = fx.ingestor.ingest(&source).await.unwrap_err();
        assert!(matches!(err, IngestError::Hashing { .. }));

        // The link is back at its original path and nothing else is left.
        assert!(std::fs::symlink_metadata(&source).unwrap().is_symlink());
        assert_eq!(dir_entries(fx.watch.path()), vec!["dangling".to_string()]);
        assert_eq!(dir_entries(fx.storage.path()), Vec::<String>::new());
        assert_eq!(dir_entries(fx.ledger.path()), Vec::<String>::new());
        assert!(fx.registry.is_empty().await);
    }
}
