//! Polling directory monitor.
//!
//! This module provides `DirectoryMonitor`, which detects new entries in
//! the watched directory by periodic listing. Polling is deliberate: it
//! needs no platform notification support and works on network mounts,
//! at the cost of up to one poll interval of detection latency.

use crate::core::error::{MonitorError, MonitorResult};
use crate::quarantine::placeholder::STAGING_PREFIX;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// Timing configuration for the monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between directory listings.
    pub poll_interval: Duration,
    /// Pause after a failed listing before retrying.
    pub error_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl MonitorConfig {
    /// Creates a configuration with default intervals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between directory listings.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the pause after a failed listing.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// Detects new entries in one watched directory.
///
/// Detection is keyed by base name and is idempotent for the lifetime
/// of the monitor: once a name has been reported (or marked seen) it is
/// never reported again, so files the pipeline restores to the watched
/// directory do not re-enter it. Placeholder staging files are skipped.
///
/// The monitor holds no lock on the directory; entries may vanish
/// between detection and ingest, which ingest tolerates.
#[derive(Debug)]
pub struct DirectoryMonitor {
    root: PathBuf,
    config: MonitorConfig,
    seen: HashSet<String>,
    first_poll: bool,
}

impl DirectoryMonitor {
    /// Creates a monitor over the given directory.
    pub fn new(root: impl Into<PathBuf>, config: MonitorConfig) -> Self {
        Self {
            root: root.into(),
            config,
            seen: HashSet::new(),
            first_poll: true,
        }
    }

    /// Returns the watched directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Marks a base name as already handled so it is never reported.
    ///
    /// Used to seed the monitor with names restored during crash
    /// recovery before the first poll runs.
    pub fn mark_seen(&mut self, name: impl Into<String>) {
        self.seen.insert(name.into());
    }

    /// Lists the watched directory once and returns unseen entries in
    /// sorted order. Reported names are recorded as seen even if the
    /// caller never ingests them.
    pub async fn poll_once(&mut self) -> MonitorResult<Vec<PathBuf>> {
        let mut reader = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| MonitorError::list(&self.root, e))?;

        let mut candidates = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| MonitorError::list(&self.root, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(STAGING_PREFIX) || self.seen.contains(&name) {
                continue;
            }
            candidates.push((name, entry.path()));
        }
        candidates.sort();

        // Seen is only touched after the listing completes, so a poll
        // cancelled mid-listing loses nothing.
        let mut batch = Vec::with_capacity(candidates.len());
        for (name, path) in candidates {
            self.seen.insert(name);
            batch.push(path);
        }
        Ok(batch)
    }

    /// Returns the next poll's worth of new entries, possibly empty.
    ///
    /// The first call polls immediately; later calls wait one poll
    /// interval first. Listing failures are logged and retried after
    /// the error backoff, indefinitely; this method never fails.
    pub async fn next_batch(&mut self) -> Vec<PathBuf> {
        loop {
            if self.first_poll {
                self.first_poll = false;
            } else {
                tokio::time::sleep(self.config.poll_interval).await;
            }

            match self.poll_once().await {
                Ok(batch) => return batch,
                Err(err) => {
                    tracing::warn!(
                        root = %self.root.display(),
                        error = %err,
                        backoff = ?self.config.error_backoff,
                        "directory listing failed, backing off"
                    );
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> MonitorConfig {
        MonitorConfig::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_error_backoff(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn reports_each_entry_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.bin"), b"b").unwrap();
        std::fs::write(dir.path().join("a.bin"), b"a").unwrap();

        let mut monitor = DirectoryMonitor::new(dir.path(), fast_config());
        let batch = monitor.poll_once().await.unwrap();
        assert_eq!(
            batch,
            vec![dir.path().join("a.bin"), dir.path().join("b.bin")]
        );

        // Same directory, nothing new.
        assert!(monitor.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detects_entries_created_between_polls() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = DirectoryMonitor::new(dir.path(), fast_config());
        assert!(monitor.poll_once().await.unwrap().is_empty());

        std::fs::write(dir.path().join("late.bin"), b"x").unwrap();
        let batch = monitor.poll_once().await.unwrap();
        assert_eq!(batch, vec![dir.path().join("late.bin")]);
    }

    #[tokio::test]
    async fn marked_names_are_never_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("restored.bin"), b"x").unwrap();

        let mut monitor = DirectoryMonitor::new(dir.path(), fast_config());
        monitor.mark_seen("restored.bin");
        assert!(monitor.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn staging_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let staged = format!("{STAGING_PREFIX}12345");
        std::fs::write(dir.path().join(&staged), b"x").unwrap();
        std::fs::write(dir.path().join("real.bin"), b"x").unwrap();

        let mut monitor = DirectoryMonitor::new(dir.path(), fast_config());
        let batch = monitor.poll_once().await.unwrap();
        assert_eq!(batch, vec![dir.path().join("real.bin")]);
    }

    #[tokio::test]
    async fn missing_root_fails_poll() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let mut monitor = DirectoryMonitor::new(&gone, fast_config());
        assert!(monitor.poll_once().await.is_err());
    }

    #[tokio::test]
    async fn first_next_batch_does_not_wait() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("early.bin"), b"x").unwrap();

        let mut monitor = DirectoryMonitor::new(
            dir.path(),
            MonitorConfig::new().with_poll_interval(Duration::from_secs(3600)),
        );
        let batch = tokio::time::timeout(Duration::from_secs(1), monitor.next_batch())
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
    }
}
