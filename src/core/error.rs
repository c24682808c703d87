//! Error types for the fileward library.
//!
//! This module provides structured, typed errors for every failure scenario
//! in the pipeline. Each stage has its own error family so callers can tell
//! at the type level which stage failed; the library never panics on I/O.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while watching the monitored directory.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Listing the watched directory failed.
    #[error("failed to list watched directory {}: {source}", .path.display())]
    List {
        /// The directory that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MonitorError {
    /// Creates a listing error for the given directory.
    pub fn list(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::List {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the quarantine path registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file exists but could not be decoded.
    #[error("failed to load registry from {}: {reason}", .path.display())]
    Load {
        /// Location of the registry file.
        path: PathBuf,
        /// Why decoding failed.
        reason: String,
    },

    /// Writing the updated registry to disk failed.
    #[error("failed to persist registry to {}: {source}", .path.display())]
    Persist {
        /// Location of the registry file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error outside load/persist.
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Creates a load error for the given registry file.
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a persist error for the given registry file.
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while creating or removing placeholders.
#[derive(Debug, Error)]
pub enum PlaceholderError {
    /// Creating the placeholder or its ledger note failed.
    #[error("failed to create placeholder at {}: {source}", .path.display())]
    Create {
        /// Where the placeholder was being created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing the placeholder or its ledger note failed.
    #[error("failed to remove placeholder at {}: {source}", .path.display())]
    Remove {
        /// The placeholder that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding a ledger note failed.
    #[error("placeholder ledger note error for key '{key}': {reason}")]
    Note {
        /// Quarantine key of the note.
        key: String,
        /// Why the note could not be handled.
        reason: String,
    },
}

impl PlaceholderError {
    /// Creates a creation error for the given path.
    pub fn create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Create {
            path: path.into(),
            source,
        }
    }

    /// Creates a removal error for the given path.
    pub fn remove(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Remove {
            path: path.into(),
            source,
        }
    }

    /// Creates a ledger note error for the given quarantine key.
    pub fn note(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Note {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while persisting or loading item metadata records.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Encoding the record to JSON failed.
    #[error("failed to serialize metadata for key '{key}': {reason}")]
    Serialize {
        /// Quarantine key of the record.
        key: String,
        /// Why encoding failed.
        reason: String,
    },

    /// Writing the record to disk failed.
    #[error("failed to write metadata to {}: {source}", .path.display())]
    Write {
        /// Destination of the record.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or decoding a stored record failed.
    #[error("failed to read metadata from {}: {reason}", .path.display())]
    Read {
        /// Location of the record.
        path: PathBuf,
        /// Why reading failed.
        reason: String,
    },

    /// No record exists for the requested key.
    #[error("no metadata record for key '{key}'")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// An I/O error outside read/write.
    #[error("metadata I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Creates a serialization error for the given key.
    pub fn serialize(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialize {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write error for the given path.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a read error for the given path.
    pub fn read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-found error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// Errors raised while moving a detected item into quarantine.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The detected entry disappeared before it could be relocated.
    #[error("source vanished before quarantine: {}", .path.display())]
    SourceVanished {
        /// The path that no longer exists.
        path: PathBuf,
    },

    /// The path cannot be ingested as an item.
    #[error("invalid ingest source {}: {reason}", .path.display())]
    InvalidSource {
        /// The rejected path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The rename into quarantine failed. Cross-device moves are
    /// reported here; ingest never falls back to copying.
    #[error("failed to relocate {} into quarantine at {}: {source}", .from.display(), .to.display())]
    Relocation {
        /// Source path in the watched directory.
        from: PathBuf,
        /// Intended destination inside quarantine storage.
        to: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No free quarantine key could be allocated for the item.
    #[error("could not allocate a quarantine key for '{name}' after {attempts} attempts")]
    KeyAllocation {
        /// Base name of the item.
        name: String,
        /// Number of candidate keys tried.
        attempts: u32,
    },

    /// Placeholder creation failed during ingest.
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    /// Registry update failed during ingest.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Hashing the quarantined contents failed.
    #[error("failed to hash quarantined contents at {}: {source}", .path.display())]
    Hashing {
        /// The quarantined item that could not be hashed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Creates a source-vanished error.
    pub fn source_vanished(path: impl Into<PathBuf>) -> Self {
        Self::SourceVanished { path: path.into() }
    }

    /// Creates an invalid-source error.
    pub fn invalid_source(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a relocation error.
    pub fn relocation(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Relocation {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Creates a key allocation error.
    pub fn key_allocation(name: impl Into<String>, attempts: u32) -> Self {
        Self::KeyAllocation {
            name: name.into(),
            attempts,
        }
    }

    /// Creates a hashing error.
    pub fn hashing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Hashing {
            path: path.into(),
            source,
        }
    }
}

/// Internal failures inside a scan engine adapter.
///
/// These never cross the [`ScanEngine`](crate::core::traits::ScanEngine)
/// boundary; adapters convert them into error verdicts so one failing
/// engine cannot abort the scan pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scanner process could not be started or awaited.
    #[error("failed to run '{command}': {source}")]
    Process {
        /// The command that failed.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The engine did not answer within its deadline.
    #[error("engine did not respond within {limit:?}")]
    Timeout {
        /// The configured deadline.
        limit: Duration,
    },

    /// An HTTP transport or status failure.
    #[error("http request to {endpoint} failed: {reason}")]
    Http {
        /// The service endpoint.
        endpoint: String,
        /// Why the request failed.
        reason: String,
    },

    /// The target cannot be submitted to this engine.
    #[error("invalid scan target: {reason}")]
    InvalidInput {
        /// Why the target was rejected.
        reason: String,
    },

    /// The engine configuration cannot produce a working adapter.
    #[error("engine configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },
}

impl EngineError {
    /// Creates a process error for the given command.
    pub fn process(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Process {
            command: command.into(),
            source,
        }
    }

    /// Creates a timeout error for the given deadline.
    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout { limit }
    }

    /// Creates an HTTP error for the given endpoint.
    pub fn http(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Errors raised while acting on an aggregate verdict.
#[derive(Debug, Error)]
pub enum DispositionError {
    /// The item has not reached a terminal status yet.
    #[error("item '{key}' has non-terminal status '{status}'; it cannot be dispositioned")]
    NotScanned {
        /// Quarantine key of the item.
        key: String,
        /// The status the item was in.
        status: String,
    },

    /// Persisting the audit metadata record failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A registry update failed during disposition.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Placeholder cleanup failed during disposition.
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),
}

impl DispositionError {
    /// Creates a not-scanned error for the given item.
    pub fn not_scanned(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self::NotScanned {
            key: key.into(),
            status: status.into(),
        }
    }
}

/// Top-level errors from building or running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline was configured incorrectly.
    #[error("pipeline configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Quarantine storage could not be prepared.
    #[error("failed to prepare {}: {source}", .path.display())]
    Storage {
        /// The directory that could not be created or opened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The registry could not be opened.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Ingest failed for an item.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Disposition failed for an item.
    #[error(transparent)]
    Disposition(#[from] DispositionError),
}

impl PipelineError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a storage preparation error.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for monitor results.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Convenience alias for registry results.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Convenience alias for placeholder results.
pub type PlaceholderResult<T> = Result<T, PlaceholderError>;

/// Convenience alias for metadata results.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Convenience alias for ingest results.
pub type IngestResult<T> = Result<T, IngestError>;

/// Convenience alias for engine-internal results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Convenience alias for disposition results.
pub type DispositionResult<T> = Result<T, DispositionError>;

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;
