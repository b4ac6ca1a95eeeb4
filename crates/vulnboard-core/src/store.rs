//! Indexed vulnerability store with parking_lot::RwLock + DashMap
//!
//! The primary collection keeps insertion order behind a `RwLock` (appends are
//! short, readers clone `Arc`s). Secondary lookups by target and by id use
//! DashMap for per-shard locking.

use crate::models::{Severity, Vulnerability};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Diagnostic summary of a store (not a byte count)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFootprint {
    pub record_count: usize,
    pub bucket_count: usize,
    /// Inserts whose id was already present
    pub duplicate_ids: usize,
}

/// Authoritative record collection for one project
///
/// Ids are not required to be unique: duplicates are stored and counted.
/// Cache invalidation is the owner's job; the store has no side effects
/// beyond its own collections.
#[derive(Debug)]
pub struct VulnerabilityStore {
    /// Name of the owning project (for logs)
    project_name: Arc<str>,

    /// All records in insertion order
    records: RwLock<Vec<Arc<Vulnerability>>>,

    /// Records grouped by target (exact, case-sensitive key)
    by_target: DashMap<Arc<str>, Vec<Arc<Vulnerability>>>,

    /// First record seen for each id
    by_id: DashMap<String, Arc<Vulnerability>>,

    duplicate_ids: AtomicUsize,
}

impl VulnerabilityStore {
    pub fn new(project_name: Arc<str>) -> Self {
        debug!(project = %project_name, "Vulnerability store created");
        Self {
            project_name,
            records: RwLock::new(Vec::with_capacity(16)),
            by_target: DashMap::new(),
            by_id: DashMap::new(),
            duplicate_ids: AtomicUsize::new(0),
        }
    }

    /// Build a store pre-populated with `records`, in order
    pub fn with_records(
        project_name: Arc<str>,
        records: impl IntoIterator<Item = Vulnerability>,
    ) -> Self {
        let store = Self::new(project_name);
        for record in records {
            store.add_record(record);
        }
        store
    }

    /// Append a record and index it by target and id
    pub fn add_record(&self, record: Vulnerability) -> Arc<Vulnerability> {
        let record = Arc::new(record);

        self.records.write().push(Arc::clone(&record));

        let target: Arc<str> = Arc::from(record.target());
        self.by_target
            .entry(target)
            .or_default()
            .push(Arc::clone(&record));

        match self.by_id.entry(record.id().to_string()) {
            Entry::Occupied(_) => {
                self.duplicate_ids.fetch_add(1, Ordering::Relaxed);
                debug!(
                    project = %self.project_name,
                    id = record.id(),
                    "Duplicate vulnerability id accepted"
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&record));
            }
        }

        record
    }

    /// Snapshot of every record, in insertion order
    pub fn all_records(&self) -> Vec<Arc<Vulnerability>> {
        self.records.read().clone()
    }

    /// Records whose target equals `target` exactly; empty when unknown
    pub fn records_for_target(&self, target: &str) -> Vec<Arc<Vulnerability>> {
        self.by_target
            .get(target)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default()
    }

    /// Primary-key lookup; with duplicate ids the first insert wins
    pub fn find_by_id(&self, id: &str) -> Option<Arc<Vulnerability>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn records_by_severity(&self, severity: Severity) -> Vec<Arc<Vulnerability>> {
        self.records
            .read()
            .iter()
            .filter(|r| r.severity() == severity)
            .cloned()
            .collect()
    }

    /// Distinct targets that have at least one record
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.by_target.iter().map(|r| r.key().to_string()).collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn memory_footprint(&self) -> StoreFootprint {
        StoreFootprint {
            record_count: self.len(),
            bucket_count: self.by_target.len(),
            duplicate_ids: self.duplicate_ids.load(Ordering::Relaxed),
        }
    }

    /// Release spare capacity in every internal buffer
    pub fn compact(&self) {
        self.records.write().shrink_to_fit();
        for mut bucket in self.by_target.iter_mut() {
            bucket.value_mut().shrink_to_fit();
        }
        self.by_target.shrink_to_fit();
        self.by_id.shrink_to_fit();

        debug!(
            project = %self.project_name,
            records = self.len(),
            buckets = self.by_target.len(),
            "Vulnerability store compacted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn store() -> VulnerabilityStore {
        VulnerabilityStore::new(Arc::from("test"))
    }

    fn vuln(id: &str, severity: Severity, target: &str) -> Vulnerability {
        Vulnerability::new(id, format!("vuln {}", id), "", severity, target)
    }

    #[test]
    fn test_insertion_order_preserved() {
        let store = store();
        store.add_record(vuln("a", Severity::Low, "t1"));
        store.add_record(vuln("b", Severity::High, "t2"));
        store.add_record(vuln("c", Severity::Medium, "t1"));

        let ids: Vec<_> = store.all_records().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_records_for_target_exact_match() {
        let store = store();
        store.add_record(vuln("a", Severity::Low, "Example.com"));
        store.add_record(vuln("b", Severity::Low, "example.com"));

        assert_eq!(store.records_for_target("example.com").len(), 1);
        assert_eq!(store.records_for_target("Example.com").len(), 1);
        assert!(store.records_for_target("missing").is_empty());
    }

    #[test]
    fn test_duplicate_ids_accepted_and_counted() {
        let store = store();
        store.add_record(vuln("dup", Severity::Low, "t1"));
        store.add_record(vuln("dup", Severity::Critical, "t1"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.memory_footprint().duplicate_ids, 1);
        // First insert wins for primary-key lookup
        assert_eq!(store.find_by_id("dup").unwrap().severity(), Severity::Low);
        assert!(store.find_by_id("nope").is_none());
    }

    #[test]
    fn test_footprint_and_compact() {
        let store = store();
        for i in 0..10 {
            store.add_record(vuln(&i.to_string(), Severity::Medium, &format!("t{}", i % 3)));
        }

        store.compact();

        let footprint = store.memory_footprint();
        assert_eq!(footprint.record_count, 10);
        assert_eq!(footprint.bucket_count, 3);
        assert_eq!(store.targets(), vec!["t0", "t1", "t2"]);
        assert_eq!(store.all_records().len(), 10);
    }

    #[test]
    fn test_records_by_severity() {
        let store = store();
        store.add_record(vuln("a", Severity::High, "t"));
        store.add_record(vuln("b", Severity::Low, "t"));
        store.add_record(vuln("c", Severity::High, "t"));

        assert_eq!(store.records_by_severity(Severity::High).len(), 2);
        assert!(store.records_by_severity(Severity::Critical).is_empty());
    }

    #[test]
    fn test_concurrent_inserts_no_lost_updates() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.add_record(vuln(&format!("{}-{}", t, i), Severity::Low, "shared"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        assert_eq!(store.records_for_target("shared").len(), 800);
        assert_eq!(store.memory_footprint().duplicate_ids, 0);
    }
}
