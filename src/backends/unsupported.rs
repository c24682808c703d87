//! Stand-in engine for unresolvable configurations.

use crate::core::traits::ScanEngine;
use crate::core::types::EngineVerdict;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Engine that reports every item as unsupported.
///
/// Substituted when a configured engine cannot be resolved to a working
/// adapter, so the failure shows up per item in the verdict map instead
/// of silently shrinking the engine set.
#[derive(Debug, Clone)]
pub struct UnsupportedEngine {
    name: String,
    reason: String,
}

impl UnsupportedEngine {
    /// Creates a new unsupported stand-in carrying the resolution failure.
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ScanEngine for UnsupportedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn scan(&self, _target: &Path) -> EngineVerdict {
        EngineVerdict::unsupported(self.reason.clone())
    }
}
