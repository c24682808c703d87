//! The coordinating loop: watch, quarantine, scan, disposition.

use crate::audit;
use crate::backends::EngineConfig;
use crate::core::error::{IngestError, PipelineError, PipelineResult, PlaceholderError};
use crate::core::hasher::ContentHasher;
use crate::core::traits::{ArcEngine, ScanEngine};
use crate::core::types::{Item, ItemKind, ItemStatus};
use crate::disposition::{Disposition, DispositionEngine};
use crate::monitor::{DirectoryMonitor, MonitorConfig};
use crate::pipeline::orchestrator::ScanOrchestrator;
use crate::quarantine::ingest::Ingestor;
use crate::quarantine::metadata::MetadataStore;
use crate::quarantine::placeholder::{PlaceholderManager, PlaceholderNote};
use crate::quarantine::registry::PathRegistry;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_error_backoff() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_items() -> usize {
    4
}

/// Configuration for a [`Pipeline`].
///
/// All paths are taken as given; the builder creates missing directories
/// on `build`. There are no ambient defaults read from the environment,
/// a config is always constructed explicitly and passed down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory watched for new items.
    pub watch_root: PathBuf,

    /// Directory items are relocated into for scanning.
    pub quarantine_root: PathBuf,

    /// Directory holding the placeholder ledger.
    pub placeholder_root: PathBuf,

    /// Path of the persisted path registry document.
    pub registry_path: PathBuf,

    /// How often the watch root is listed.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// How long to wait after a failed listing.
    #[serde(default = "default_error_backoff")]
    pub error_backoff: Duration,

    /// Upper bound on items processed concurrently.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,

    /// Engines to materialize at build time, in addition to any added
    /// programmatically on the builder.
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
}

impl PipelineConfig {
    /// Creates a configuration with default cadence and concurrency.
    pub fn new(
        watch_root: impl Into<PathBuf>,
        quarantine_root: impl Into<PathBuf>,
        placeholder_root: impl Into<PathBuf>,
        registry_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            watch_root: watch_root.into(),
            quarantine_root: quarantine_root.into(),
            placeholder_root: placeholder_root.into(),
            registry_path: registry_path.into(),
            poll_interval: default_poll_interval(),
            error_backoff: default_error_backoff(),
            max_concurrent_items: default_max_concurrent_items(),
            engines: Vec::new(),
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the backoff applied after listing errors.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Sets the concurrent item limit.
    pub fn with_max_concurrent_items(mut self, limit: usize) -> Self {
        self.max_concurrent_items = limit;
        self
    }

    /// Appends an engine to materialize at build time.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engines.push(engine);
        self
    }
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    engines: Vec<ArcEngine>,
    hasher: ContentHasher,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            config: None,
            engines: Vec::new(),
            hasher: ContentHasher::new(),
        }
    }

    /// Sets the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds a scan engine.
    pub fn add_engine<E: ScanEngine + 'static>(mut self, engine: E) -> Self {
        self.engines.push(Arc::new(engine));
        self
    }

    /// Adds a scan engine wrapped in an `Arc`.
    pub fn add_arc_engine(mut self, engine: ArcEngine) -> Self {
        self.engines.push(engine);
        self
    }

    /// Adds an engine described by configuration.
    pub fn add_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engines.push(engine.build());
        self
    }

    /// Overrides the content hasher used at ingest.
    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Builds the pipeline.
    ///
    /// Creates the watch, quarantine, and placeholder directories if
    /// missing and loads the persisted registry.
    ///
    /// # Errors
    ///
    /// Fails with [`PipelineError::Configuration`] when no configuration
    /// was given, no engine is available, or the concurrency limit is
    /// zero; with [`PipelineError::Storage`] when a directory cannot be
    /// prepared; and with [`PipelineError::Registry`] when the persisted
    /// registry cannot be loaded.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let config = self
            .config
            .ok_or_else(|| PipelineError::configuration("a pipeline configuration is required"))?;

        let mut engines = self.engines;
        for spec in &config.engines {
            engines.push(spec.clone().build());
        }
        if engines.is_empty() {
            return Err(PipelineError::configuration(
                "at least one scan engine is required",
            ));
        }
        if config.max_concurrent_items == 0 {
            return Err(PipelineError::configuration(
                "max_concurrent_items must be at least 1",
            ));
        }

        for dir in [&config.watch_root, &config.quarantine_root] {
            std::fs::create_dir_all(dir).map_err(|err| PipelineError::storage(dir, err))?;
        }
        if let Some(parent) = config.registry_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| PipelineError::storage(parent, err))?;
        }

        let placeholders =
            Arc::new(
                PlaceholderManager::open(&config.placeholder_root).map_err(|err| match err {
                    PlaceholderError::Create { path, source } => {
                        PipelineError::storage(path, source)
                    }
                    other => PipelineError::configuration(other.to_string()),
                })?,
            );
        let registry = Arc::new(PathRegistry::open(&config.registry_path)?);
        let metadata = MetadataStore::new(&config.quarantine_root);

        let ingestor = Ingestor::new(
            &config.quarantine_root,
            Arc::clone(&placeholders),
            Arc::clone(&registry),
            metadata.clone(),
        )
        .with_hasher(self.hasher.clone());
        let disposition = DispositionEngine::new(
            Arc::clone(&registry),
            Arc::clone(&placeholders),
            metadata.clone(),
        );

        let limiter = Arc::new(Semaphore::new(config.max_concurrent_items));

        tracing::info!(
            watch_root = %config.watch_root.display(),
            quarantine_root = %config.quarantine_root.display(),
            engine_count = engines.len(),
            max_concurrent_items = config.max_concurrent_items,
            "pipeline assembled"
        );

        Ok(Pipeline {
            config,
            orchestrator: ScanOrchestrator::new(engines),
            ingestor,
            disposition,
            registry,
            placeholders,
            metadata,
            hasher: self.hasher,
            limiter,
            recovered: Mutex::new(Vec::new()),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled quarantine-and-scan pipeline.
///
/// Drives the full item lifecycle: the monitor detects new entries in
/// the watch root, ingest relocates them into quarantine behind a
/// placeholder, the orchestrator runs every engine, and disposition
/// restores or keeps the item. [`Pipeline::run`] owns the loop;
/// [`Pipeline::process_path`] exposes a single item's journey for
/// embedders with their own detection feed.
pub struct Pipeline {
    config: PipelineConfig,
    orchestrator: ScanOrchestrator,
    ingestor: Ingestor,
    disposition: DispositionEngine,
    registry: Arc<PathRegistry>,
    placeholders: Arc<PlaceholderManager>,
    metadata: MetadataStore,
    hasher: ContentHasher,
    limiter: Arc<Semaphore>,
    /// Watch-root names recovery already settled, so the next `run`
    /// does not re-detect what it just restored or placeholded.
    recovered: Mutex<Vec<String>>,
}

impl Pipeline {
    /// Creates a new builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the number of configured engines.
    pub fn engine_count(&self) -> usize {
        self.orchestrator.engine_count()
    }

    /// Returns the shared path registry.
    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    /// Returns the metadata store over quarantine storage.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Runs the watch loop until `shutdown` flips to `true`.
    ///
    /// Each detected path is processed by an independent task, admitted
    /// through the concurrency limiter. On shutdown the loop stops
    /// accepting new items and drains the in-flight ones to a terminal
    /// state before returning, so no item is abandoned mid-scan. A
    /// dropped shutdown sender counts as a shutdown signal.
    pub async fn run(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> PipelineResult<()> {
        let monitor_config = MonitorConfig::new()
            .with_poll_interval(self.config.poll_interval)
            .with_error_backoff(self.config.error_backoff);
        let mut monitor = DirectoryMonitor::new(&self.config.watch_root, monitor_config);
        for name in self.recovered.lock().await.drain(..) {
            monitor.mark_seen(name);
        }

        tracing::info!(
            watch_root = %self.config.watch_root.display(),
            poll_interval_secs = self.config.poll_interval.as_secs_f64(),
            "pipeline running"
        );

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        loop {
            tokio::select! {
                batch = monitor.next_batch() => {
                    for path in batch {
                        if *shutdown.borrow() {
                            break;
                        }
                        audit::emit_item_detected(&path);
                        let permit = match Arc::clone(&self.limiter).acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => break,
                        };
                        let pipeline = Arc::clone(self);
                        workers.push(tokio::spawn(async move {
                            let _permit = permit;
                            match pipeline.process_path(&path).await {
                                Ok(_) => {}
                                Err(PipelineError::Ingest(IngestError::SourceVanished {
                                    path: gone,
                                })) => {
                                    tracing::debug!(
                                        path = %gone.display(),
                                        "source vanished before ingest"
                                    );
                                }
                                Err(err) => {
                                    tracing::warn!(
                                        path = %path.display(),
                                        error = %err,
                                        "item processing failed, left for a later pass"
                                    );
                                }
                            }
                        }));
                    }
                    workers.retain(|worker| !worker.is_finished());
                    if *shutdown.borrow() {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if !*shutdown.borrow() => {}
                        _ => break,
                    }
                }
            }
        }

        tracing::info!(in_flight = workers.len(), "pipeline stopping, draining");
        for worker in workers {
            if let Err(err) = worker.await {
                tracing::error!(error = %err, "worker task aborted");
            }
        }
        Ok(())
    }

    /// Carries one detected path through quarantine, scan, and
    /// disposition.
    ///
    /// # Errors
    ///
    /// Propagates ingest and disposition failures. Engine failures never
    /// surface here; they become error verdicts on the item.
    pub async fn process_path(&self, source: &Path) -> PipelineResult<Disposition> {
        let mut item = self.ingestor.ingest(source).await?;
        audit::emit_item_quarantined(&item);

        self.orchestrator.scan_item(&mut item).await;

        let outcome = self.disposition.dispose(&item).await?;
        audit::emit_disposition(&item, &outcome);
        Ok(outcome)
    }

    /// Re-admits items a previous process left in quarantine.
    ///
    /// Walks the persisted registry: entries whose quarantine copy is
    /// gone are dropped as stale; every other entry gets its placeholder
    /// re-created if missing, is re-scanned, and is dispositioned to a
    /// terminal state. Returns the number of items re-admitted. Call
    /// before [`Pipeline::run`]; the names settled here are excluded
    /// from re-detection by the next run.
    pub async fn recover_pending(&self) -> PipelineResult<usize> {
        let entries = self.registry.entries().await;
        if entries.is_empty() {
            return Ok(0);
        }

        tracing::info!(pending = entries.len(), "recovering quarantined items");
        let mut readmitted = 0usize;

        for (key, original_path) in entries {
            let quarantine_path = self.config.quarantine_root.join(&key);
            let meta = match tokio::fs::symlink_metadata(&quarantine_path).await {
                Ok(meta) => meta,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    // The bytes left quarantine out of band, so the
                    // entry goes. Whatever sits at the original path is
                    // no longer provably ours and is left alone.
                    self.registry.remove(&key).await?;
                    if let Err(err) = self.placeholders.discard_note(&key).await {
                        tracing::debug!(key = %key, error = %err, "stale ledger note kept");
                    }
                    tracing::warn!(
                        key = %key,
                        "removed stale registry entry, quarantine copy is gone"
                    );
                    if tokio::fs::symlink_metadata(&original_path).await.is_ok() {
                        self.remember_name(&original_path).await;
                    }
                    continue;
                }
                Err(err) => return Err(PipelineError::storage(quarantine_path, err)),
            };
            let kind = if meta.is_dir() {
                ItemKind::Directory
            } else {
                ItemKind::File
            };
            self.remember_name(&original_path).await;

            // Re-create the stand-in if a crash took it with it. The
            // quarantine copy and the registry entry are authoritative
            // over whatever the ledger note says.
            let mut note = match self.placeholders.load_note(&key).await {
                Ok(Some(note)) => note,
                Ok(None) => PlaceholderNote::new(&key, &original_path, kind),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "ledger note unreadable");
                    PlaceholderNote::new(&key, &original_path, kind)
                }
            };
            note.kind = kind;
            note.original_path = original_path.clone();
            if let Err(err) = self.placeholders.ensure_present(&note).await {
                tracing::warn!(key = %key, error = %err, "could not re-create placeholder");
            }

            let hasher = self.hasher.clone();
            let hash_target = quarantine_path.clone();
            let content_hash =
                match tokio::task::spawn_blocking(move || hasher.hash_path(&hash_target)).await {
                    Ok(Ok(hash)) => hash,
                    Ok(Err(err)) => {
                        tracing::warn!(
                            key = %key,
                            error = %err,
                            "skipping recovery of unreadable quarantine copy"
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "hashing task failed");
                        continue;
                    }
                };

            let mut item = Item {
                id: Uuid::new_v4().to_string(),
                quarantine_key: key.clone(),
                original_path: original_path.clone(),
                quarantine_path,
                kind,
                content_hash,
                status: ItemStatus::Moved,
                engine_verdicts: BTreeMap::new(),
                detected_at: Utc::now(),
                scanned_at: None,
            };
            audit::emit_recovery_admission(&item);

            self.orchestrator.scan_item(&mut item).await;

            let outcome = self.disposition.dispose(&item).await?;
            audit::emit_disposition(&item, &outcome);
            readmitted += 1;
        }

        Ok(readmitted)
    }

    async fn remember_name(&self, original_path: &Path) {
        if let Some(name) = original_path.file_name() {
            self.recovered
                .lock()
                .await
                .push(name.to_string_lossy().into_owned());
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine_count", &self.orchestrator.engine_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockEngine;
    use tempfile::TempDir;

    struct Roots {
        watch: TempDir,
        storage: TempDir,
        ledger: TempDir,
        registry: TempDir,
    }

    impl Roots {
        fn new() -> Self {
            Self {
                watch: TempDir::new().unwrap(),
                storage: TempDir::new().unwrap(),
                ledger: TempDir::new().unwrap(),
                registry: TempDir::new().unwrap(),
            }
        }

        fn config(&self) -> PipelineConfig {
            PipelineConfig::new(
                self.watch.path(),
                self.storage.path(),
                self.ledger.path(),
                self.registry.path().join("registry.json"),
            )
        }
    }

    fn quarantined_payloads(storage: &Path) -> usize {
        std::fs::read_dir(storage)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| {
                !entry
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".metadata.json")
            })
            .count()
    }

    #[test]
    fn builder_requires_config() {
        let err = Pipeline::builder()
            .add_engine(MockEngine::new("m"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn builder_requires_an_engine() {
        let roots = Roots::new();
        let err = Pipeline::builder()
            .with_config(roots.config())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let roots = Roots::new();
        let err = Pipeline::builder()
            .with_config(roots.config().with_max_concurrent_items(0))
            .add_engine(MockEngine::new("m"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn builder_materializes_configured_engines() {
        let roots = Roots::new();
        let config = roots
            .config()
            .with_engine(EngineConfig::local_process("clamd", "clamdscan"));
        let pipeline = Pipeline::builder()
            .with_config(config)
            .add_engine(MockEngine::new("extra"))
            .build()
            .unwrap();
        assert_eq!(pipeline.engine_count(), 2);
    }

    #[test]
    fn config_defaults_apply_on_deserialize() {
        let json = r#"{
            "watch_root": "/srv/watch",
            "quarantine_root": "/srv/quarantine",
            "placeholder_root": "/srv/ledger",
            "registry_path": "/srv/registry.json"
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.error_backoff, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_items, 4);
        assert!(config.engines.is_empty());
    }

    #[tokio::test]
    async fn clean_file_travels_to_restoration() {
        let roots = Roots::new();
        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::new("first"))
            .add_engine(MockEngine::new("second"))
            .build()
            .unwrap();

        let source = roots.watch.path().join("report.pdf");
        std::fs::write(&source, b"payload").unwrap();

        let outcome = pipeline.process_path(&source).await.unwrap();
        assert!(outcome.is_restored());

        assert_eq!(std::fs::read(&source).unwrap(), b"payload");
        assert!(pipeline.registry().is_empty().await);
        assert_eq!(quarantined_payloads(roots.storage.path()), 0);
        assert_eq!(std::fs::read_dir(roots.ledger.path()).unwrap().count(), 0);

        let records = pipeline.metadata().list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ItemStatus::Clean);
        assert_eq!(records[0].engine_verdicts.len(), 2);
    }

    #[tokio::test]
    async fn infected_file_stays_in_quarantine() {
        let roots = Roots::new();
        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::new("calm"))
            .add_engine(MockEngine::infected("alert", "Eicar-Test-Signature"))
            .build()
            .unwrap();

        let source = roots.watch.path().join("dropper.exe");
        std::fs::write(&source, b"payload").unwrap();

        let outcome = pipeline.process_path(&source).await.unwrap();
        assert_eq!(outcome, Disposition::Quarantined);

        assert!(!source.exists());
        assert_eq!(pipeline.registry().len().await, 1);
        assert_eq!(quarantined_payloads(roots.storage.path()), 1);

        let records = pipeline.metadata().list().await.unwrap();
        assert_eq!(records[0].status, ItemStatus::Infected);
        assert!(records[0].engine_verdicts["calm"].is_clean());
        assert!(records[0].engine_verdicts["alert"].is_infected());
    }

    #[tokio::test]
    async fn run_loop_processes_dropped_files() {
        let roots = Roots::new();
        let engine = Arc::new(MockEngine::new("fast"));
        let pipeline = Arc::new(
            Pipeline::builder()
                .with_config(roots.config().with_poll_interval(Duration::from_millis(25)))
                .add_arc_engine(Arc::clone(&engine) as ArcEngine)
                .build()
                .unwrap(),
        );

        let (tx, rx) = watch::channel(false);
        let runner = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.run(rx).await }
        });

        let source = roots.watch.path().join("inbound.bin");
        std::fs::write(&source, b"fresh").unwrap();

        // Wait for the full detect-scan-restore cycle.
        let mut settled = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if engine.scan_count() == 1
                && pipeline.registry().is_empty().await
                && std::fs::read(&source).map(|b| b == b"fresh").unwrap_or(false)
            {
                settled = true;
                break;
            }
        }
        assert!(settled, "item never settled back into the watch root");

        // A few more polls must not re-detect the restored file.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.scan_count(), 1);

        tx.send(true).unwrap();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_drains_in_flight_items() {
        let roots = Roots::new();
        let engine = Arc::new(MockEngine::new("slowish").with_latency(Duration::from_millis(250)));
        let pipeline = Arc::new(
            Pipeline::builder()
                .with_config(roots.config().with_poll_interval(Duration::from_millis(25)))
                .add_arc_engine(Arc::clone(&engine) as ArcEngine)
                .build()
                .unwrap(),
        );

        let (tx, rx) = watch::channel(false);
        let runner = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.run(rx).await }
        });

        let source = roots.watch.path().join("in-flight.bin");
        std::fs::write(&source, b"payload").unwrap();

        // Wait until the item is in quarantine, then pull the plug
        // mid-scan.
        let mut ingested = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if quarantined_payloads(roots.storage.path()) == 1 {
                ingested = true;
                break;
            }
        }
        assert!(ingested, "item was never ingested");
        tx.send(true).unwrap();
        runner.await.unwrap().unwrap();

        // run() returned only after the worker carried the item to a
        // terminal state.
        assert_eq!(std::fs::read(&source).unwrap(), b"payload");
        assert!(pipeline.registry().is_empty().await);
        assert_eq!(engine.scan_count(), 1);
    }

    #[tokio::test]
    async fn recover_pending_restores_clean_leftovers() {
        let roots = Roots::new();

        // Fabricate a crash: an item was ingested but never scanned.
        {
            let placeholders = Arc::new(PlaceholderManager::open(roots.ledger.path()).unwrap());
            let registry = Arc::new(
                PathRegistry::open(roots.registry.path().join("registry.json")).unwrap(),
            );
            let metadata = MetadataStore::new(roots.storage.path());
            let ingestor = Ingestor::new(roots.storage.path(), placeholders, registry, metadata);

            let source = roots.watch.path().join("interrupted.bin");
            std::fs::write(&source, b"survivor").unwrap();
            ingestor.ingest(&source).await.unwrap();
        }

        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::new("fast"))
            .build()
            .unwrap();

        let readmitted = pipeline.recover_pending().await.unwrap();
        assert_eq!(readmitted, 1);

        let restored = roots.watch.path().join("interrupted.bin");
        assert_eq!(std::fs::read(&restored).unwrap(), b"survivor");
        assert!(pipeline.registry().is_empty().await);
        assert_eq!(quarantined_payloads(roots.storage.path()), 0);
    }

    #[tokio::test]
    async fn recover_pending_requarantines_infected_leftovers() {
        let roots = Roots::new();

        {
            let placeholders = Arc::new(PlaceholderManager::open(roots.ledger.path()).unwrap());
            let registry = Arc::new(
                PathRegistry::open(roots.registry.path().join("registry.json")).unwrap(),
            );
            let metadata = MetadataStore::new(roots.storage.path());
            let ingestor = Ingestor::new(roots.storage.path(), placeholders, registry, metadata);

            let source = roots.watch.path().join("lurker.bin");
            std::fs::write(&source, b"payload").unwrap();
            ingestor.ingest(&source).await.unwrap();
        }

        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::infected("alert", "Worm.Test"))
            .build()
            .unwrap();

        let readmitted = pipeline.recover_pending().await.unwrap();
        assert_eq!(readmitted, 1);

        assert_eq!(pipeline.registry().len().await, 1);
        assert_eq!(quarantined_payloads(roots.storage.path()), 1);
        let records = pipeline.metadata().list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ItemStatus::Infected);
    }

    #[tokio::test]
    async fn recover_pending_drops_stale_entries() {
        let roots = Roots::new();

        {
            let placeholders = Arc::new(PlaceholderManager::open(roots.ledger.path()).unwrap());
            let registry = Arc::new(
                PathRegistry::open(roots.registry.path().join("registry.json")).unwrap(),
            );
            let metadata = MetadataStore::new(roots.storage.path());
            let ingestor =
                Ingestor::new(roots.storage.path(), placeholders, Arc::clone(&registry), metadata);

            let source = roots.watch.path().join("vanishing.bin");
            std::fs::write(&source, b"payload").unwrap();
            let item = ingestor.ingest(&source).await.unwrap();

            // Someone deleted the quarantine copy out of band.
            std::fs::remove_file(&item.quarantine_path).unwrap();
        }

        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::new("fast"))
            .build()
            .unwrap();

        let readmitted = pipeline.recover_pending().await.unwrap();
        assert_eq!(readmitted, 0);
        assert!(pipeline.registry().is_empty().await);
        // Whatever occupies the original path is left alone.
        assert!(roots.watch.path().join("vanishing.bin").exists());
    }

    #[tokio::test]
    async fn recover_pending_with_empty_registry_is_a_noop() {
        let roots = Roots::new();
        let pipeline = Pipeline::builder()
            .with_config(roots.config())
            .add_engine(MockEngine::new("fast"))
            .build()
            .unwrap();

        assert_eq!(pipeline.recover_pending().await.unwrap(), 0);
    }
}
