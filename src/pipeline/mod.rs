//! Pipeline assembly and the coordinating run loop.
//!
//! [`PipelineBuilder`] wires the monitor, ingest, engines, and
//! disposition together over a [`PipelineConfig`]; [`Pipeline::run`]
//! drives the watch loop with bounded concurrency and drain-on-shutdown;
//! [`ScanOrchestrator`] fans one item out across every engine.

pub mod orchestrator;
pub mod runner;

pub use orchestrator::ScanOrchestrator;
pub use runner::{Pipeline, PipelineBuilder, PipelineConfig};
