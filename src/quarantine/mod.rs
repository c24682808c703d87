//! Quarantine storage and its bookkeeping.
//!
//! This module owns everything that happens between detection and
//! disposition: relocating items into quarantine ([`ingest`]), the
//! durable key-to-origin mapping ([`registry`]), the stand-ins left at
//! vacated paths ([`placeholder`]), and the per-item audit records
//! ([`metadata`]).

pub mod ingest;
pub mod metadata;
pub mod placeholder;
pub mod registry;

pub use ingest::Ingestor;
pub use metadata::{ItemRecord, MetadataStore};
pub use placeholder::{PlaceholderManager, PlaceholderNote};
pub use registry::PathRegistry;
