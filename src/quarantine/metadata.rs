//! Per-item audit metadata records.
//!
//! Every item that reaches disposition leaves one pretty-printed JSON
//! record next to its quarantine slot, named
//! `{quarantine_key}.metadata.json`. Records are written through a
//! staged sibling and an atomic rename, so a reader never observes a
//! partial document. Records are never deleted by the pipeline; they
//! are the durable answer to "what happened to this file".

use crate::core::error::{MetadataError, MetadataResult};
use crate::core::types::{ContentHash, EngineVerdict, Item, ItemKind, ItemStatus};
use crate::quarantine::placeholder::STAGING_PREFIX;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

const RECORD_SUFFIX: &str = ".metadata.json";

/// Durable audit record for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Process-unique item identifier.
    pub id: String,

    /// Quarantine key the item is (or was) stored under.
    pub quarantine_key: String,

    /// File or directory.
    pub kind: ItemKind,

    /// Where the item was detected and may be restored to.
    pub original_path: PathBuf,

    /// Where the item sits (or sat) in quarantine.
    pub quarantine_path: PathBuf,

    /// Digest of the quarantined contents.
    pub content_hash: ContentHash,

    /// Aggregate status at the time of recording.
    pub status: ItemStatus,

    /// Every engine's verdict.
    pub engine_verdicts: BTreeMap<String, EngineVerdict>,

    /// When the monitor first observed the item.
    pub detected_at: DateTime<Utc>,

    /// When the scan pass completed, if it ran.
    pub scanned_at: Option<DateTime<Utc>>,

    /// When this record was written.
    pub recorded_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Builds a record from an item, stamping the recording time.
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            quarantine_key: item.quarantine_key.clone(),
            kind: item.kind,
            original_path: item.original_path.clone(),
            quarantine_path: item.quarantine_path.clone(),
            content_hash: item.content_hash.clone(),
            status: item.status,
            engine_verdicts: item.engine_verdicts.clone(),
            detected_at: item.detected_at,
            scanned_at: item.scanned_at,
            recorded_at: Utc::now(),
        }
    }
}

/// Reads and writes `ItemRecord` documents under one root directory.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Creates a store rooted at the given directory (conventionally the
    /// quarantine root, so records sit beside the items they describe).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the record path for a quarantine key.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{RECORD_SUFFIX}"))
    }

    /// Writes (or overwrites) the record for an item.
    pub async fn persist(&self, record: &ItemRecord) -> MetadataResult<()> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| MetadataError::serialize(&record.quarantine_key, e.to_string()))?;

        let path = self.record_path(&record.quarantine_key);
        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{}{RECORD_SUFFIX}", record.quarantine_key));

        let write = async {
            let mut file = tokio::fs::File::create(&staging).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&staging, &path).await
        };
        write.await.map_err(|e| MetadataError::write(&path, e))
    }

    /// Loads the record for a quarantine key.
    pub async fn load(&self, key: &str) -> MetadataResult<ItemRecord> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MetadataError::not_found(key));
            }
            Err(e) => return Err(MetadataError::Io(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| MetadataError::read(&path, e.to_string()))
    }

    /// Lists every record under the root, sorted by quarantine key
    /// (which sorts chronologically, keys being timestamp-prefixed).
    /// Undecodable records are logged and skipped rather than failing
    /// the whole listing.
    pub async fn list(&self) -> MetadataResult<Vec<ItemRecord>> {
        let mut reader = tokio::fs::read_dir(&self.root).await.map_err(MetadataError::Io)?;

        let mut records = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(MetadataError::Io)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(STAGING_PREFIX) || !name.ends_with(RECORD_SUFFIX) {
                continue;
            }
            let key = name.trim_end_matches(RECORD_SUFFIX).to_string();
            match self.load(&key).await {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %err,
                        "skipping undecodable metadata record"
                    );
                }
            }
        }
        records.sort_by(|a, b| a.quarantine_key.cmp(&b.quarantine_key));
        Ok(records)
    }
}
