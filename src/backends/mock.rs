//! Mock engine for testing.
//!
//! This module provides a configurable mock engine that can be used in
//! tests to simulate verdicts and latencies without requiring a real
//! scanner.

use crate::core::traits::ScanEngine;
use crate::core::types::EngineVerdict;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

/// A mock engine for testing purposes.
///
/// Returns a fixed verdict for every target, optionally after a
/// simulated latency, and records what it was asked to scan.
///
/// # Examples
///
/// ```rust
/// use fileward::backends::MockEngine;
/// use std::time::Duration;
///
/// // An engine that reports everything clean
/// let clean = MockEngine::new("mock-clean");
///
/// // An engine that flags everything
/// let hostile = MockEngine::infected("mock-av", "Test.Malware");
///
/// // A slow engine for timeout tests
/// let slow = MockEngine::new("mock-slow")
///     .with_latency(Duration::from_secs(5))
///     .with_timeout(Duration::from_millis(50));
/// ```
#[derive(Debug)]
pub struct MockEngine {
    name: String,
    verdict: RwLock<EngineVerdict>,
    latency: Option<Duration>,
    timeout: Duration,
    scan_count: AtomicU64,
    scanned: Mutex<Vec<PathBuf>>,
}

impl MockEngine {
    /// Creates a mock engine that reports every target clean.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: RwLock::new(EngineVerdict::clean("ok")),
            latency: None,
            timeout: Duration::from_secs(5),
            scan_count: AtomicU64::new(0),
            scanned: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock engine that flags every target with the given threat.
    pub fn infected(name: impl Into<String>, threat: impl Into<String>) -> Self {
        Self::new(name).with_verdict(EngineVerdict::infected(threat))
    }

    /// Creates a mock engine that fails every scan with the given detail.
    pub fn erroring(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name).with_verdict(EngineVerdict::error(detail))
    }

    /// Sets the verdict returned for every target.
    pub fn with_verdict(self, verdict: EngineVerdict) -> Self {
        *self.verdict.write().unwrap() = verdict;
        self
    }

    /// Sets the simulated scan latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the advertised scan deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the verdict after construction.
    pub fn set_verdict(&self, verdict: EngineVerdict) {
        *self.verdict.write().unwrap() = verdict;
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Returns the targets this engine has been asked to scan.
    pub fn scanned_paths(&self) -> Vec<PathBuf> {
        self.scanned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanEngine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan_timeout(&self) -> Duration {
        self.timeout
    }

    async fn scan(&self, target: &Path) -> EngineVerdict {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        self.scanned.lock().unwrap().push(target.to_path_buf());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.verdict.read().unwrap().clone()
    }
}
