//! # Fileward
//!
//! A quarantine-first malware scanning pipeline for watched directories.
//!
//! ## Overview
//!
//! Fileward watches a directory for new entries, relocates each arrival
//! into quarantine storage before anything can open it, stands a
//! placeholder in its place, scans the quarantined contents with every
//! configured engine concurrently, and then either restores the item to
//! its original path or keeps it locked away with a durable metadata
//! record. It lets you:
//!
//! - Watch a drop directory and process arrivals automatically
//! - Scan with multiple engines (local scanner processes, remote HTTP
//!   scan services) and aggregate their verdicts conservatively
//! - Survive crashes: the persisted path registry re-admits quarantined
//!   items on the next start
//! - Follow every item through structured audit events and a per-item
//!   metadata record in quarantine storage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fileward::backends::EngineConfig;
//! use fileward::{Pipeline, PipelineConfig};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::new(
//!         "/srv/dropbox",
//!         "/var/lib/fileward/quarantine",
//!         "/var/lib/fileward/ledger",
//!         "/var/lib/fileward/registry.json",
//!     )
//!     .with_engine(EngineConfig::local_process("clamav", "clamdscan"));
//!
//!     let pipeline = Arc::new(Pipeline::builder().with_config(config).build()?);
//!
//!     // Settle anything a previous run left in quarantine.
//!     pipeline.recover_pending().await?;
//!
//!     let (shutdown, signal) = watch::channel(false);
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown.send(true);
//!     });
//!
//!     pipeline.run(signal).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: item and verdict types, error taxonomy, content hashing
//! - **Monitor**: polling detection over the watch root
//! - **Backends**: scan engine adapters (local process, remote HTTP, mock)
//! - **Quarantine**: ingest, placeholders, path registry, metadata records
//! - **Pipeline**: per-item orchestration and the coordinating loop
//! - **Disposition**: restore-or-keep decisions after aggregation
//! - **Audit**: structured lifecycle events for compliance trails

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod disposition;
pub mod monitor;
pub mod pipeline;
pub mod quarantine;

// Re-export commonly used types at the crate root
pub use crate::core::error::{PipelineError, PipelineResult};
pub use crate::core::{
    aggregate, ArcEngine, ContentHash, ContentHasher, EngineStatus, EngineVerdict, Item, ItemKind,
    ItemStatus, ScanEngine,
};

pub use crate::disposition::{Disposition, DispositionEngine};
pub use crate::monitor::{DirectoryMonitor, MonitorConfig};
pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineConfig, ScanOrchestrator};
pub use crate::quarantine::{ItemRecord, MetadataStore, PathRegistry};

/// Prelude module for convenient imports.
///
/// ```rust
/// use fileward::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::error::{PipelineError, PipelineResult};
    pub use crate::core::{
        aggregate, ArcEngine, ContentHash, ContentHasher, EngineStatus, EngineVerdict, Item,
        ItemKind, ItemStatus, ScanEngine,
    };
    pub use crate::disposition::{Disposition, DispositionEngine};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineConfig, ScanOrchestrator};
    pub use crate::quarantine::{ItemRecord, MetadataStore, PathRegistry};
}
