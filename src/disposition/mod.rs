//! Terminal handling for scanned items.
//!
//! Once every engine has spoken and the verdicts are aggregated, the
//! [`DispositionEngine`] settles the item: clean items are renamed back
//! to where they came from, everything else stays in quarantine. Either
//! way a durable metadata record is written first and the placeholder
//! is taken down.

pub mod engine;

pub use engine::{Disposition, DispositionEngine};
