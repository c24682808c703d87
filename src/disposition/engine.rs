//! Final state transitions for scanned items.
//!
//! Disposition is the last stage of an item's life: it writes the audit
//! record, removes the placeholder, and then either restores the item
//! to its original path or leaves it in quarantine. The ordering is
//! fixed: metadata first (an audit record must exist whatever happens
//! next), placeholder removal second (a stand-in never survives its
//! item's disposition), the restore rename last.

use crate::core::error::{DispositionError, DispositionResult};
use crate::core::types::{Item, ItemStatus};
use crate::quarantine::metadata::{ItemRecord, MetadataStore};
use crate::quarantine::placeholder::PlaceholderManager;
use crate::quarantine::registry::PathRegistry;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of dispositioning one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The item was renamed back to its original path.
    Restored {
        /// Where the item now lives.
        original_path: PathBuf,
    },

    /// The item stays in quarantine (infected or undecided).
    Quarantined,

    /// The item should have been restored but could not be; it remains
    /// in quarantine with its registry entry intact, recoverable by a
    /// later pass.
    RestoreFailed {
        /// Why the restore did not happen.
        reason: String,
    },
}

impl Disposition {
    /// Returns `true` if the item ended up back at its original path.
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored { .. } => write!(f, "restored"),
            Self::Quarantined => write!(f, "quarantined"),
            Self::RestoreFailed { .. } => write!(f, "restore_failed"),
        }
    }
}

/// Applies aggregate verdicts: restore clean items, keep the rest.
#[derive(Debug)]
pub struct DispositionEngine {
    registry: Arc<PathRegistry>,
    placeholders: Arc<PlaceholderManager>,
    metadata: MetadataStore,
}

impl DispositionEngine {
    /// Creates a disposition engine over the shared bookkeeping stores.
    pub fn new(
        registry: Arc<PathRegistry>,
        placeholders: Arc<PlaceholderManager>,
        metadata: MetadataStore,
    ) -> Self {
        Self {
            registry,
            placeholders,
            metadata,
        }
    }

    /// Dispositions an item that has reached a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`DispositionError::NotScanned`] for items still moving
    /// through the pipeline, and propagates metadata or placeholder
    /// failures. A failed restore is not an error but a
    /// [`Disposition::RestoreFailed`] outcome: the item stays safely in
    /// quarantine and its registry entry stays live.
    pub async fn dispose(&self, item: &Item) -> DispositionResult<Disposition> {
        if !item.status.is_terminal() {
            return Err(DispositionError::not_scanned(
                &item.quarantine_key,
                item.status.to_string(),
            ));
        }

        self.metadata.persist(&ItemRecord::from_item(item)).await?;

        self.placeholders
            .remove(&item.quarantine_key, &item.original_path, item.kind)
            .await?;

        match item.status {
            ItemStatus::Clean => self.restore(item).await,
            _ => {
                tracing::debug!(
                    key = %item.quarantine_key,
                    status = %item.status,
                    "item kept in quarantine"
                );
                Ok(Disposition::Quarantined)
            }
        }
    }

    async fn restore(&self, item: &Item) -> DispositionResult<Disposition> {
        let original = match self.registry.get(&item.quarantine_key).await {
            Some(path) => path,
            None => {
                tracing::warn!(
                    key = %item.quarantine_key,
                    "no registry entry at restore time, falling back to the item's recorded origin"
                );
                item.original_path.clone()
            }
        };

        if let Err(err) = tokio::fs::rename(&item.quarantine_path, &original).await {
            tracing::error!(
                key = %item.quarantine_key,
                from = %item.quarantine_path.display(),
                to = %original.display(),
                error = %err,
                "restore rename failed, item remains quarantined"
            );
            return Ok(Disposition::RestoreFailed {
                reason: err.to_string(),
            });
        }

        if let Err(err) = self.registry.remove(&item.quarantine_key).await {
            // An entry may only exist while its item is in quarantine,
            // so with the removal stuck the item goes back.
            if let Err(back) = tokio::fs::rename(&original, &item.quarantine_path).await {
                tracing::error!(
                    key = %item.quarantine_key,
                    error = %back,
                    "registry entry is stale: removal failed and the item could not be re-quarantined"
                );
            }
            return Ok(Disposition::RestoreFailed {
                reason: err.to_string(),
            });
        }

        tracing::debug!(
            key = %item.quarantine_key,
            to = %original.display(),
            "item restored"
        );
        Ok(Disposition::Restored {
            original_path: original,
        })
    }
}
