//! Fan-out of a single item across every configured engine.

use crate::audit;
use crate::core::error::EngineError;
use crate::core::traits::ArcEngine;
use crate::core::types::{EngineVerdict, Item, ItemStatus};
use crate::core::verdict::aggregate;

use chrono::Utc;
use futures::future::join_all;
use std::path::Path;

/// Runs all engines against one item and aggregates their verdicts.
///
/// Engines run concurrently, each under its own deadline; an engine that
/// overruns it is recorded with an error verdict while its siblings'
/// verdicts stand. The orchestrator never fails an item outright: every
/// outcome, including a hung or crashed engine, becomes a verdict in the
/// item's map and flows into the aggregate.
#[derive(Debug, Clone)]
pub struct ScanOrchestrator {
    engines: Vec<ArcEngine>,
}

impl ScanOrchestrator {
    /// Creates an orchestrator over the given engines.
    pub fn new(engines: Vec<ArcEngine>) -> Self {
        Self { engines }
    }

    /// Returns the number of configured engines.
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Returns the configured engines.
    pub fn engines(&self) -> &[ArcEngine] {
        &self.engines
    }

    /// Scans the item's quarantined contents with every engine.
    ///
    /// On return the item carries one verdict per engine, an aggregate
    /// status (`Clean`, `Infected`, or `Error`), and a scan completion
    /// timestamp. With no engines configured the item aggregates to
    /// `Error`, never to `Clean`.
    pub async fn scan_item(&self, item: &mut Item) {
        item.status = ItemStatus::Scanning;

        let target = item.quarantine_path.clone();
        let scans = self.engines.iter().map(|engine| {
            let target = target.as_path();
            async move {
                let verdict = run_engine(engine, target).await;
                (engine.name().to_string(), verdict)
            }
        });
        let outcomes = join_all(scans).await;

        for (engine, verdict) in outcomes {
            audit::emit_engine_verdict(item, &engine, &verdict);
            item.engine_verdicts.insert(engine, verdict);
        }

        item.status = aggregate(&item.engine_verdicts);
        item.scanned_at = Some(Utc::now());
        audit::emit_aggregate_verdict(item);
    }
}

async fn run_engine(engine: &ArcEngine, target: &Path) -> EngineVerdict {
    let limit = engine.scan_timeout();
    match tokio::time::timeout(limit, engine.scan(target)).await {
        Ok(verdict) => verdict,
        Err(_) => {
            tracing::warn!(
                engine = engine.name(),
                limit_secs = limit.as_secs(),
                target = %target.display(),
                "engine overran its deadline"
            );
            EngineVerdict::error(EngineError::timeout(limit).to_string())
        }
    }
}
