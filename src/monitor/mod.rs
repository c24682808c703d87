//! Watched-directory monitoring.
//!
//! Poll-based detection of new entries in the watched directory. See
//! [`watcher::DirectoryMonitor`] for the dedupe and retry semantics.

pub mod watcher;

pub use watcher::{DirectoryMonitor, MonitorConfig};
