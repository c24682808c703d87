//! Core traits for the fileward library.
//!
//! This module defines the `ScanEngine` trait that all engine adapters
//! must implement.

use crate::core::types::EngineVerdict;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

/// The core trait for scan engine adapters.
///
/// An adapter wraps one submission channel to an antivirus engine (a
/// local command, an HTTP service) behind a uniform interface. Adapters
/// are isolated from each other: `scan` is infallible at the type level
/// and converts every internal failure into a verdict with
/// [`EngineStatus::Error`](crate::core::types::EngineStatus::Error), so
/// one broken engine can never abort the pass over its siblings.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` for use in async contexts.
/// - `scan` receives the quarantine path; the target is guaranteed to
///   exist for the duration of the call.
/// - `scan_timeout` is the per-call deadline the orchestrator enforces
///   from the outside. Adapters may additionally enforce it internally
///   (killing a hung process, aborting a request) so resources are not
///   leaked past the deadline.
/// - Implementations should never panic.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use fileward::core::{EngineVerdict, ScanEngine};
/// use async_trait::async_trait;
/// use std::path::Path;
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// struct MyEngine {
///     name: String,
/// }
///
/// #[async_trait]
/// impl ScanEngine for MyEngine {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn scan_timeout(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     async fn scan(&self, target: &Path) -> EngineVerdict {
///         // Submit the target and classify the response...
///         EngineVerdict::clean("ok")
///     }
/// }
/// ```
#[async_trait]
pub trait ScanEngine: Send + Sync + Debug {
    /// Returns the name of this engine.
    ///
    /// Names must be unique within one pipeline; they key the
    /// per-engine verdict map and appear in audit records.
    fn name(&self) -> &str;

    /// Returns the per-scan deadline for this engine.
    fn scan_timeout(&self) -> Duration;

    /// Scans the target and classifies the outcome.
    ///
    /// Never fails: transport errors, process failures, and rejected
    /// inputs are all folded into the returned verdict.
    async fn scan(&self, target: &Path) -> EngineVerdict;
}

/// An arc-wrapped engine for shared ownership across scan tasks.
pub type ArcEngine = std::sync::Arc<dyn ScanEngine>;
