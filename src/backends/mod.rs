//! Scan engine adapters.
//!
//! This module contains implementations of the `ScanEngine` trait for
//! the supported submission channels.
//!
//! ## Available Adapters
//!
//! - [`local`] - Scanners invoked as local commands (clamdscan style)
//! - [`http`] - Scanning services reached over HTTP multipart upload
//! - [`unsupported`] - Stand-in for engines that could not be resolved
//! - [`mock`] - A configurable engine for testing
//!
//! [`config`] resolves declarative engine descriptions to adapters.
//!
//! ## Implementing a Custom Adapter
//!
//! To add a new submission channel, implement the `ScanEngine` trait:
//!
//! ```rust,ignore
//! use fileward::core::{EngineVerdict, ScanEngine};
//! use async_trait::async_trait;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! pub struct MyEngine {
//!     // Your engine's configuration
//! }
//!
//! #[async_trait]
//! impl ScanEngine for MyEngine {
//!     fn name(&self) -> &str {
//!         "my-engine"
//!     }
//!
//!     fn scan_timeout(&self) -> Duration {
//!         Duration::from_secs(60)
//!     }
//!
//!     async fn scan(&self, target: &Path) -> EngineVerdict {
//!         // Submit the target and fold any failure into the verdict
//!         EngineVerdict::clean("ok")
//!     }
//! }
//! ```

pub mod config;
pub mod http;
pub mod local;
pub mod mock;
pub mod unsupported;

// Re-exports
pub use config::{EngineConfig, EngineSettings};
pub use http::HttpEngine;
pub use local::LocalProcessEngine;
pub use mock::MockEngine;
pub use unsupported::UnsupportedEngine;
