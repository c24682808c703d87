//! Structured audit logging for the item lifecycle.
//!
//! Every consequential transition is emitted as a structured `tracing`
//! event under the `fileward::audit` target: detection, quarantine, each
//! engine verdict, the aggregate verdict, the final disposition, and
//! recovery re-admissions. Any subscriber (JSON file, OpenTelemetry,
//! etc.) can capture the stream. The metadata records in quarantine
//! storage remain the durable source of truth; these events are the
//! narration.

mod events;

pub use events::{
    emit_aggregate_verdict, emit_disposition, emit_engine_verdict, emit_item_detected,
    emit_item_quarantined, emit_recovery_admission, AUDIT_TARGET,
};
