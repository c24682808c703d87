//! Audit event emission functions.

use crate::core::types::{EngineVerdict, Item};
use crate::disposition::Disposition;

use std::path::Path;

/// Target every audit event is emitted under.
///
/// Subscribers that want the lifecycle narration and nothing else can
/// filter on this target, e.g. `fileward::audit=info`.
pub const AUDIT_TARGET: &str = "fileward::audit";

/// Emits an audit event for a newly detected item.
pub fn emit_item_detected(path: &Path) {
    tracing::info!(
        target: "fileward::audit",
        event_type = "item_detected",
        path = %path.display(),
        "Item detected"
    );
}

/// Emits an audit event for a completed ingest.
///
/// From this point on the item's bytes live in quarantine and the
/// registry knows the way back.
pub fn emit_item_quarantined(item: &Item) {
    tracing::info!(
        target: "fileward::audit",
        event_type = "item_quarantined",
        item_id = %item.id,
        quarantine_key = %item.quarantine_key,
        original_path = %item.original_path.display(),
        kind = %item.kind,
        hash_blake3 = %item.content_hash.blake3,
        hash_sha256 = ?item.content_hash.sha256,
        "Item quarantined"
    );
}

/// Emits an audit event for a single engine's verdict.
pub fn emit_engine_verdict(item: &Item, engine: &str, verdict: &EngineVerdict) {
    tracing::info!(
        target: "fileward::audit",
        event_type = "engine_verdict",
        item_id = %item.id,
        quarantine_key = %item.quarantine_key,
        engine = %engine,
        status = %verdict.status,
        detail = %verdict.detail,
        "Engine verdict recorded"
    );
}

/// Emits an audit event for the aggregate verdict across all engines.
pub fn emit_aggregate_verdict(item: &Item) {
    let engines: Vec<&str> = item.detecting_engines();
    tracing::info!(
        target: "fileward::audit",
        event_type = "aggregate_verdict",
        item_id = %item.id,
        quarantine_key = %item.quarantine_key,
        status = %item.status,
        engine_count = item.engine_verdicts.len(),
        detecting_engines = ?engines,
        "Aggregate verdict reached"
    );
}

/// Emits an audit event for an item's final disposition.
pub fn emit_disposition(item: &Item, outcome: &Disposition) {
    let reason = match outcome {
        Disposition::RestoreFailed { reason } => Some(reason.as_str()),
        _ => None,
    };
    tracing::info!(
        target: "fileward::audit",
        event_type = "disposition",
        item_id = %item.id,
        quarantine_key = %item.quarantine_key,
        status = %item.status,
        disposition = %outcome,
        reason = ?reason,
        "Item dispositioned"
    );
}

/// Emits an audit event for a quarantined item re-admitted at startup.
pub fn emit_recovery_admission(item: &Item) {
    tracing::info!(
        target: "fileward::audit",
        event_type = "recovery_admission",
        item_id = %item.id,
        quarantine_key = %item.quarantine_key,
        original_path = %item.original_path.display(),
        kind = %item.kind,
        "Quarantined item re-admitted for scanning"
    );
}
