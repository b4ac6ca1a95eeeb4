//! Aggregate views computed from a project

use super::{Severity, Vulnerability};
use crate::store::StoreFootprint;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Aggregate counts for a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatistics {
    pub target_count: usize,
    pub tag_count: usize,
    pub vulnerability_count: usize,
    /// Every severity is present (zero default) once a store exists;
    /// empty when the project never held a store
    pub severity_counts: BTreeMap<Severity, usize>,
    /// Records carrying a non-blank CVE identifier
    pub cve_count: usize,
}

impl ProjectStatistics {
    /// Statistics for a project whose store was never created
    pub fn without_store(target_count: usize, tag_count: usize) -> Self {
        Self {
            target_count,
            tag_count,
            ..Default::default()
        }
    }

    pub fn from_records(
        target_count: usize,
        tag_count: usize,
        records: &[Arc<Vulnerability>],
    ) -> Self {
        let mut severity_counts: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut cve_count = 0;

        for record in records {
            *severity_counts.entry(record.severity()).or_insert(0) += 1;
            if record.has_cve() {
                cve_count += 1;
            }
        }

        Self {
            target_count,
            tag_count,
            vulnerability_count: records.len(),
            severity_counts,
            cve_count,
        }
    }

    /// Count for one severity, zero when absent
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }
}

/// Memory diagnostics for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub target_count: usize,
    pub tag_count: usize,
    pub has_listing_cache: bool,
    pub has_stats_cache: bool,
    /// Time since each cached view was built
    pub listing_age: Option<Duration>,
    pub stats_age: Option<Duration>,
    pub store: Option<StoreFootprint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_records_fills_all_severities() {
        let records = vec![
            Arc::new(Vulnerability::new("1", "a", "", Severity::High, "t1")),
            Arc::new(
                Vulnerability::new("2", "b", "", Severity::Critical, "t1").with_cve("CVE-2023-1234"),
            ),
        ];

        let stats = ProjectStatistics::from_records(1, 0, &records);
        assert_eq!(stats.vulnerability_count, 2);
        assert_eq!(stats.cve_count, 1);
        assert_eq!(stats.severity_counts.len(), 4);
        assert_eq!(stats.severity_count(Severity::High), 1);
        assert_eq!(stats.severity_count(Severity::Critical), 1);
        assert_eq!(stats.severity_count(Severity::Medium), 0);
        assert_eq!(stats.severity_count(Severity::Low), 0);
    }

    #[test]
    fn test_without_store_is_empty() {
        let stats = ProjectStatistics::without_store(2, 3);
        assert_eq!(stats.target_count, 2);
        assert_eq!(stats.tag_count, 3);
        assert_eq!(stats.vulnerability_count, 0);
        assert!(stats.severity_counts.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = ProjectStatistics::without_store(0, 0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["vulnerabilityCount"], 0);
        assert_eq!(json["cveCount"], 0);
    }
}
