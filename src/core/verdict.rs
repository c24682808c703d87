//! Aggregation of per-engine verdicts into an item status.

use crate::core::types::{EngineVerdict, ItemStatus};

use std::collections::BTreeMap;

/// Folds a full set of per-engine verdicts into one terminal status.
///
/// Precedence is infection first, then failure, then clean:
///
/// - any [`Infected`](crate::core::types::EngineStatus::Infected) verdict
///   makes the item `Infected`, regardless of what other engines said;
/// - otherwise any error or unsupported verdict makes the item `Error`;
/// - only a non-empty set of all-clean verdicts makes the item `Clean`.
///
/// An empty verdict map aggregates to `Error`: an item nothing examined
/// must never be treated as clean.
pub fn aggregate(verdicts: &BTreeMap<String, EngineVerdict>) -> ItemStatus {
    if verdicts.is_empty() {
        return ItemStatus::Error;
    }
    if verdicts.values().any(EngineVerdict::is_infected) {
        return ItemStatus::Infected;
    }
    if verdicts.values().any(EngineVerdict::is_inconclusive) {
        return ItemStatus::Error;
    }
    ItemStatus::Clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdicts(entries: &[(&str, EngineVerdict)]) -> BTreeMap<String, EngineVerdict> {
        entries
            .iter()
            .map(|(name, v)| (name.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn all_clean_aggregates_clean() {
        let v = verdicts(&[
            ("escan", EngineVerdict::clean("ok")),
            ("mcafee", EngineVerdict::clean("ok")),
        ]);
        assert_eq!(aggregate(&v), ItemStatus::Clean);
    }

    #[test]
    fn single_infection_wins() {
        let v = verdicts(&[
            ("escan", EngineVerdict::clean("ok")),
            ("mcafee", EngineVerdict::infected("Eicar-Test-Signature")),
            ("sophos", EngineVerdict::clean("ok")),
        ]);
        assert_eq!(aggregate(&v), ItemStatus::Infected);
    }

    #[test]
    fn infection_outranks_error() {
        let v = verdicts(&[
            ("escan", EngineVerdict::error("connection refused")),
            ("mcafee", EngineVerdict::infected("Trojan.Generic")),
        ]);
        assert_eq!(aggregate(&v), ItemStatus::Infected);
    }

    #[test]
    fn error_without_infection_aggregates_error() {
        let v = verdicts(&[
            ("escan", EngineVerdict::clean("ok")),
            ("mcafee", EngineVerdict::error("timed out")),
        ]);
        assert_eq!(aggregate(&v), ItemStatus::Error);
    }

    #[test]
    fn unsupported_counts_as_error() {
        let v = verdicts(&[
            ("escan", EngineVerdict::clean("ok")),
            ("legacy", EngineVerdict::unsupported("no adapter")),
        ]);
        assert_eq!(aggregate(&v), ItemStatus::Error);
    }

    #[test]
    fn empty_map_is_error() {
        assert_eq!(aggregate(&BTreeMap::new()), ItemStatus::Error);
    }
}
