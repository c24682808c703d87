//! Core types used throughout the fileward library.
//!
//! This module defines the fundamental data structures for representing
//! items moving through the pipeline, per-engine verdicts, content hashes,
//! and lifecycle status values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Whether an item is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A regular file.
    File,
    /// A directory, treated as one indivisible item.
    Directory,
}

impl ItemKind {
    /// Returns `true` if the item is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Classification reported by a single scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// The engine found no threats.
    Clean,
    /// The engine detected an infection.
    Infected,
    /// The engine failed to produce a verdict (timeout, transport, process error).
    Error,
    /// The engine could not be resolved to a working adapter.
    Unsupported,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Infected => write!(f, "infected"),
            Self::Error => write!(f, "error"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// One engine's classification of an item plus supporting detail.
///
/// The detail carries the threat name for infections, the decoded backend
/// response for clean results, or the error text for failures. Adapters
/// never raise past their boundary; every transport failure becomes a
/// verdict with [`EngineStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVerdict {
    /// The classification.
    pub status: EngineStatus,
    /// Threat name, raw backend response, or error text.
    pub detail: String,
}

impl EngineVerdict {
    /// Creates a clean verdict.
    pub fn clean(detail: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Clean,
            detail: detail.into(),
        }
    }

    /// Creates an infected verdict carrying the threat name or raw signal.
    pub fn infected(detail: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Infected,
            detail: detail.into(),
        }
    }

    /// Creates an error verdict carrying the failure diagnostic.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Error,
            detail: detail.into(),
        }
    }

    /// Creates an unsupported verdict explaining why the engine could not run.
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Unsupported,
            detail: detail.into(),
        }
    }

    /// Returns `true` if the verdict is clean.
    pub fn is_clean(&self) -> bool {
        self.status == EngineStatus::Clean
    }

    /// Returns `true` if the verdict reports an infection.
    pub fn is_infected(&self) -> bool {
        self.status == EngineStatus::Infected
    }

    /// Returns `true` if the engine failed or was unsupported.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self.status, EngineStatus::Error | EngineStatus::Unsupported)
    }
}

/// Lifecycle status of an item in the pipeline.
///
/// Items move `Moved → Scanning → {Clean, Infected, Error}`. The three
/// terminal values are produced by aggregating the per-engine verdicts;
/// they are never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Relocated into quarantine, not yet scanned.
    Moved,
    /// Scan dispatch in progress.
    Scanning,
    /// Every engine reported clean.
    Clean,
    /// At least one engine reported an infection.
    Infected,
    /// At least one engine failed and none reported an infection.
    Error,
}

impl ItemStatus {
    /// Returns `true` if no further scanning will change this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Clean | Self::Infected | Self::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved => write!(f, "moved"),
            Self::Scanning => write!(f, "scanning"),
            Self::Clean => write!(f, "clean"),
            Self::Infected => write!(f, "infected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Content digest of an item, used for audit identity.
///
/// BLAKE3 is always computed. SHA-256 is optional and provided for
/// cross-referencing with external threat databases; it is never used
/// for pipeline decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    /// BLAKE3 hash, the primary identity digest.
    pub blake3: String,

    /// SHA-256 hash, when enabled on the hasher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ContentHash {
    /// Creates a `ContentHash` with only the BLAKE3 digest.
    pub fn new(blake3: impl Into<String>) -> Self {
        Self {
            blake3: blake3.into(),
            sha256: None,
        }
    }

    /// Sets the SHA-256 digest.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Returns the primary (BLAKE3) digest.
    pub fn primary(&self) -> &str {
        &self.blake3
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// One file or directory moving through the pipeline.
///
/// An `Item` is created by ingest once the detected entry has been
/// relocated into quarantine, and accumulates per-engine verdicts as
/// the orchestrator runs. `original_path` and `quarantine_path` are
/// fixed at ingest and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Process-unique identifier (UUID v4).
    pub id: String,

    /// Name under which the item is stored in quarantine. Never reused
    /// while the item's registry entry exists.
    pub quarantine_key: String,

    /// Absolute path at the time of detection.
    pub original_path: PathBuf,

    /// Absolute path inside quarantine storage.
    pub quarantine_path: PathBuf,

    /// File or directory.
    pub kind: ItemKind,

    /// Digest computed over the quarantined contents.
    pub content_hash: ContentHash,

    /// Current lifecycle status.
    pub status: ItemStatus,

    /// Per-engine verdicts, keyed by engine name.
    pub engine_verdicts: BTreeMap<String, EngineVerdict>,

    /// When the monitor first observed the item.
    pub detected_at: DateTime<Utc>,

    /// When the scan pass over all engines completed.
    pub scanned_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Returns the verdict recorded for the named engine, if any.
    pub fn verdict(&self, engine: &str) -> Option<&EngineVerdict> {
        self.engine_verdicts.get(engine)
    }

    /// Returns the engines that reported an infection.
    pub fn detecting_engines(&self) -> Vec<&str> {
        self.engine_verdicts
            .iter()
            .filter(|(_, v)| v.is_infected())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_verdict_constructors() {
        assert!(EngineVerdict::clean("ok").is_clean());
        assert!(EngineVerdict::infected("Eicar-Test-Signature").is_infected());
        assert!(EngineVerdict::error("connection refused").is_inconclusive());
        assert!(EngineVerdict::unsupported("no adapter").is_inconclusive());
    }

    #[test]
    fn item_status_terminal() {
        assert!(!ItemStatus::Moved.is_terminal());
        assert!(!ItemStatus::Scanning.is_terminal());
        assert!(ItemStatus::Clean.is_terminal());
        assert!(ItemStatus::Infected.is_terminal());
        assert!(ItemStatus::Error.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ItemStatus::Infected).unwrap();
        assert_eq!(json, "\"infected\"");
        let json = serde_json::to_string(&EngineStatus::Unsupported).unwrap();
        assert_eq!(json, "\"unsupported\"");
    }

    #[test]
    fn content_hash_display() {
        let hash = ContentHash::new("abc123").with_sha256("def456");
        assert_eq!(format!("{}", hash), "blake3:abc123");
        assert_eq!(hash.primary(), "abc123");
    }

    #[test]
    fn item_detecting_engines() {
        let mut verdicts = BTreeMap::new();
        verdicts.insert("escan".to_string(), EngineVerdict::clean("ok"));
        verdicts.insert(
            "mcafee".to_string(),
            EngineVerdict::infected("Trojan.Generic"),
        );
        let item = Item {
            id: "test".into(),
            quarantine_key: "20240101T000000.000_sample.bin".into(),
            original_path: PathBuf::from("/watch/sample.bin"),
            quarantine_path: PathBuf::from("/storage/20240101T000000.000_sample.bin"),
            kind: ItemKind::File,
            content_hash: ContentHash::new("abc"),
            status: ItemStatus::Infected,
            engine_verdicts: verdicts,
            detected_at: Utc::now(),
            scanned_at: Some(Utc::now()),
        };
        assert_eq!(item.detecting_engines(), vec!["mcafee"]);
        assert!(item.verdict("escan").unwrap().is_clean());
    }
}
