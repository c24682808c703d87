//! Core types and traits for the fileward library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Common types like `Item`, `EngineVerdict`, `ContentHash`
//! - [`traits`] - The `ScanEngine` trait
//! - [`error`] - Structured error types, one family per pipeline stage
//! - [`hasher`] - BLAKE3-based content hashing
//! - [`verdict`] - Aggregation of engine verdicts into an item status

pub mod error;
pub mod hasher;
pub mod traits;
pub mod types;
pub mod verdict;

// Re-export commonly used types at the core level
pub use error::{
    DispositionError, EngineError, IngestError, MetadataError, MonitorError, PipelineError,
    PlaceholderError, RegistryError,
};
pub use hasher::ContentHasher;
pub use traits::{ArcEngine, ScanEngine};
pub use types::{ContentHash, EngineStatus, EngineVerdict, Item, ItemKind, ItemStatus};
pub use verdict::aggregate;
