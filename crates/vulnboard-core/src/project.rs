//! Project: membership sets, a lazily created vulnerability store and two
//! TTL-bounded cached views (full listing, statistics).
//!
//! Mutations write through to the sets or the store and then clear both views.
//! Reads serve a copy of a fresh view, or recompute it from the store. Two
//! threads may both recompute a stale view; a generation counter keeps a
//! recomputation that overlapped a mutation from being published.

use crate::config::ProjectConfig;
use crate::error::CoreError;
use crate::intern;
use crate::models::{
    MemoryStats, ProjectMetadata, ProjectSnapshot, ProjectStatistics, Vulnerability,
};
use crate::store::VulnerabilityStore;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

const DEFAULT_STATUS: &str = "ACTIVE";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A cached value and the instant it was built
#[derive(Debug)]
struct CachedView<T> {
    value: T,
    built_at: Instant,
}

impl<T> CachedView<T> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.built_at)
    }
}

/// Both cached views share one staleness clock
#[derive(Debug, Default)]
struct ViewCache {
    listing: Option<CachedView<Vec<Arc<Vulnerability>>>>,
    statistics: Option<CachedView<ProjectStatistics>>,
    last_update: Option<Instant>,
}

impl ViewCache {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.last_update
            .is_some_and(|built| now.saturating_duration_since(built) < ttl)
    }

    fn clear(&mut self) {
        self.listing = None;
        self.statistics = None;
        self.last_update = None;
    }
}

/// Free-text project details
#[derive(Debug, Default)]
struct ProjectDetails {
    description: Option<Arc<str>>,
    scope: Option<Arc<str>>,
    created_by: Option<Arc<str>>,
    notes: Option<Arc<str>>,
}

/// A pentest project
///
/// Thread-safe: share it as `Arc<Project>` and call any method concurrently.
/// Equality and hashing use the generated id only.
pub struct Project {
    id: Arc<str>,
    name: Arc<str>,
    created_at: DateTime<Utc>,
    config: ProjectConfig,

    last_modified: RwLock<DateTime<Utc>>,
    status: RwLock<Arc<str>>,
    details: RwLock<ProjectDetails>,

    targets: DashSet<Arc<str>>,
    tags: DashSet<Arc<str>>,

    /// Created on first write or explicit access, never by plain reads
    vulnerabilities: OnceCell<VulnerabilityStore>,

    cache: Mutex<ViewCache>,
    /// Bumped by every invalidation
    generation: AtomicU64,
}

impl Project {
    /// Create a project with the default cache TTL
    pub fn new(name: &str) -> Result<Self, CoreError> {
        Self::with_config(name, ProjectConfig::default())
    }

    pub fn with_config(name: &str, config: ProjectConfig) -> Result<Self, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidProjectName);
        }

        let created_at = Utc::now();
        let project = Self::assemble(
            Arc::from(Uuid::new_v4().to_string()),
            Arc::from(name),
            created_at,
            created_at,
            intern::global().intern_status(DEFAULT_STATUS),
            config,
        );

        debug!(project = %project.name, id = %project.id, "Project created");
        Ok(project)
    }

    /// Rebuild a project from a persisted snapshot, keeping its id and timestamps
    pub fn from_snapshot(snapshot: ProjectSnapshot, config: ProjectConfig) -> Result<Self, CoreError> {
        let name = snapshot.name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidProjectName);
        }

        let id = if snapshot.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            snapshot.id
        };
        let status = if snapshot.status.trim().is_empty() {
            DEFAULT_STATUS
        } else {
            snapshot.status.as_str()
        };

        let pool = intern::global();
        let project = Self::assemble(
            Arc::from(id),
            Arc::from(name),
            snapshot.created_at,
            snapshot.last_modified.max(snapshot.created_at),
            pool.intern_status(status),
            config,
        );

        {
            let mut details = project.details.write();
            details.description = snapshot.description.as_deref().map(Arc::from);
            details.scope = snapshot.scope.as_deref().map(Arc::from);
            details.created_by = snapshot.created_by.as_deref().map(Arc::from);
            details.notes = snapshot.notes.as_deref().map(Arc::from);
        }

        for target in snapshot.targets.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            project.targets.insert(Arc::from(target));
        }
        for tag in snapshot.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            project.tags.insert(pool.intern_tag(tag));
        }

        if !snapshot.vulnerabilities.is_empty() {
            let store =
                VulnerabilityStore::with_records(Arc::clone(&project.name), snapshot.vulnerabilities);
            // Freshly assembled, so the cell is always empty here
            let _ = project.vulnerabilities.set(store);
        }

        debug!(project = %project.name, id = %project.id, "Project restored from snapshot");
        Ok(project)
    }

    fn assemble(
        id: Arc<str>,
        name: Arc<str>,
        created_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
        status: Arc<str>,
        config: ProjectConfig,
    ) -> Self {
        Self {
            id,
            name,
            created_at,
            config,
            last_modified: RwLock::new(last_modified),
            status: RwLock::new(status),
            details: RwLock::new(ProjectDetails::default()),
            targets: DashSet::with_capacity(16),
            tags: DashSet::with_capacity(8),
            vulnerabilities: OnceCell::new(),
            cache: Mutex::new(ViewCache::default()),
            generation: AtomicU64::new(0),
        }
    }

    // ===================
    // Identity & details
    // ===================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        *self.last_modified.read()
    }

    pub fn config(&self) -> ProjectConfig {
        self.config
    }

    pub fn status(&self) -> Arc<str> {
        self.status.read().clone()
    }

    /// Set the status (upper-cased); blank input is ignored
    pub fn set_status(&self, status: &str) -> bool {
        if status.trim().is_empty() {
            return false;
        }
        *self.status.write() = intern::global().intern_status(status);
        self.touch();
        true
    }

    pub fn description(&self) -> Option<Arc<str>> {
        self.details.read().description.clone()
    }

    pub fn scope(&self) -> Option<Arc<str>> {
        self.details.read().scope.clone()
    }

    pub fn created_by(&self) -> Option<Arc<str>> {
        self.details.read().created_by.clone()
    }

    pub fn notes(&self) -> Option<Arc<str>> {
        self.details.read().notes.clone()
    }

    pub fn set_description(&self, description: Option<&str>) {
        self.details.write().description = description.map(Arc::from);
        self.touch();
    }

    pub fn set_scope(&self, scope: Option<&str>) {
        self.details.write().scope = scope.map(Arc::from);
        self.touch();
    }

    pub fn set_created_by(&self, created_by: Option<&str>) {
        self.details.write().created_by = created_by.map(Arc::from);
        self.touch();
    }

    pub fn set_notes(&self, notes: Option<&str>) {
        self.details.write().notes = notes.map(Arc::from);
        self.touch();
    }

    // ===================
    // Membership
    // ===================

    /// Add a target; returns false for blank or already-present values
    pub fn add_target(&self, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() {
            return false;
        }

        let added = self.targets.insert(Arc::from(target));
        if added {
            self.touch();
            self.invalidate_caches();
        }
        added
    }

    /// Remove a target; returns whether it was present
    pub fn remove_target(&self, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() {
            return false;
        }

        let removed = self.targets.remove(target).is_some();
        if removed {
            self.touch();
            self.invalidate_caches();
        }
        removed
    }

    /// Add a tag; common tags are stored lowercase
    pub fn add_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }

        let added = self.tags.insert(intern::global().intern_tag(tag));
        if added {
            self.touch();
            self.invalidate_caches();
        }
        added
    }

    /// Remove a tag; returns whether it was present.
    ///
    /// Only `last_modified` changes: cached views are left as they are, so a
    /// cached `tag_count` can lag until the next invalidation or TTL expiry.
    pub fn remove_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }

        let removed = self.tags.remove(intern::canonical_tag(tag).as_ref()).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.targets.contains(target.trim())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(intern::canonical_tag(tag.trim()).as_ref())
    }

    /// Targets, sorted
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.targets.iter().map(|t| t.to_string()).collect();
        targets.sort();
        targets
    }

    /// Tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tags.iter().map(|t| t.to_string()).collect();
        tags.sort();
        tags
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    // ===================
    // Vulnerabilities
    // ===================

    /// The project's store, created on first call
    pub fn vulnerabilities(&self) -> &VulnerabilityStore {
        self.vulnerabilities
            .get_or_init(|| VulnerabilityStore::new(Arc::clone(&self.name)))
    }

    /// Whether the store has been created yet
    pub fn has_store(&self) -> bool {
        self.vulnerabilities.get().is_some()
    }

    /// Add a record; `None` is a no-op. Returns whether a record was stored.
    pub fn add_vulnerability(&self, vulnerability: impl Into<Option<Vulnerability>>) -> bool {
        let Some(vulnerability) = vulnerability.into() else {
            return false;
        };

        self.vulnerabilities().add_record(vulnerability);
        self.touch();
        self.invalidate_caches();
        true
    }

    /// Every record, served from the listing cache while it is fresh.
    ///
    /// The returned `Vec` is the caller's own copy.
    pub fn all_vulnerabilities(&self) -> Vec<Arc<Vulnerability>> {
        let now = Instant::now();
        {
            let cache = self.cache.lock();
            if cache.is_fresh(now, self.config.cache_ttl) {
                if let Some(view) = &cache.listing {
                    return view.value.clone();
                }
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let records = self
            .vulnerabilities
            .get()
            .map(|store| store.all_records())
            .unwrap_or_default();

        self.publish(generation, |cache, built_at| {
            cache.listing = Some(CachedView {
                value: records.clone(),
                built_at,
            });
        });
        debug!(project = %self.name, count = records.len(), "Listing cache rebuilt");

        records
    }

    /// Records for one target; always read through the store
    pub fn vulnerabilities_for_target(&self, target: &str) -> Vec<Arc<Vulnerability>> {
        self.vulnerabilities
            .get()
            .map(|store| store.records_for_target(target))
            .unwrap_or_default()
    }

    pub fn find_vulnerability(&self, id: &str) -> Option<Arc<Vulnerability>> {
        self.vulnerabilities.get().and_then(|store| store.find_by_id(id))
    }

    // ===================
    // Statistics
    // ===================

    /// Aggregate counts, served from the statistics cache while it is fresh
    pub fn statistics(&self) -> ProjectStatistics {
        let now = Instant::now();
        {
            let cache = self.cache.lock();
            if cache.is_fresh(now, self.config.cache_ttl) {
                if let Some(view) = &cache.statistics {
                    return view.value.clone();
                }
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let stats = self.compute_statistics();

        self.publish(generation, |cache, built_at| {
            cache.statistics = Some(CachedView {
                value: stats.clone(),
                built_at,
            });
        });
        debug!(
            project = %self.name,
            vulnerabilities = stats.vulnerability_count,
            "Statistics cache rebuilt"
        );

        stats
    }

    /// Uncached statistics; never creates the store
    pub fn compute_statistics(&self) -> ProjectStatistics {
        match self.vulnerabilities.get() {
            Some(store) => ProjectStatistics::from_records(
                self.targets.len(),
                self.tags.len(),
                &store.all_records(),
            ),
            None => ProjectStatistics::without_store(self.targets.len(), self.tags.len()),
        }
    }

    // ===================
    // Cache & memory
    // ===================

    /// Drop both cached views; idempotent
    pub fn invalidate_caches(&self) {
        let mut cache = self.cache.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        cache.clear();
    }

    /// Drop cached views and compact the store. Safe at any time; intended for
    /// quiet periods.
    pub fn reclaim_memory(&self) {
        self.invalidate_caches();
        if let Some(store) = self.vulnerabilities.get() {
            store.compact();
        }
        debug!(project = %self.name, "Project memory reclaimed");
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let now = Instant::now();
        let (listing_age, stats_age) = {
            let cache = self.cache.lock();
            (
                cache.listing.as_ref().map(|v| v.age(now)),
                cache.statistics.as_ref().map(|v| v.age(now)),
            )
        };

        MemoryStats {
            target_count: self.targets.len(),
            tag_count: self.tags.len(),
            has_listing_cache: listing_age.is_some(),
            has_stats_cache: stats_age.is_some(),
            listing_age,
            stats_age,
            store: self.vulnerabilities.get().map(|s| s.memory_footprint()),
        }
    }

    // ===================
    // Persistence helpers
    // ===================

    pub fn snapshot(&self) -> ProjectSnapshot {
        let details = self.details.read();
        ProjectSnapshot {
            id: self.id.to_string(),
            name: self.name.to_string(),
            created_at: self.created_at,
            last_modified: self.last_modified(),
            status: self.status().to_string(),
            description: details.description.as_deref().map(str::to_string),
            scope: details.scope.as_deref().map(str::to_string),
            created_by: details.created_by.as_deref().map(str::to_string),
            notes: details.notes.as_deref().map(str::to_string),
            targets: self.targets(),
            tags: self.tags(),
            vulnerabilities: self
                .vulnerabilities
                .get()
                .map(|store| store.all_records().iter().map(|r| (**r).clone()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn metadata(&self) -> ProjectMetadata {
        ProjectMetadata {
            id: self.id.to_string(),
            name: self.name.to_string(),
            created_at: self.created_at,
            last_modified: self.last_modified(),
            status: self.status().to_string(),
            target_count: self.targets.len(),
            vulnerability_count: self.vulnerabilities.get().map_or(0, |s| s.len()),
        }
    }

    /// Multi-line, human-readable summary
    pub fn formatted_info(&self) -> String {
        let mut info = String::with_capacity(256);
        info.push_str(&format!("📁 Project: {}", self.name));

        if let Some(description) = self.description().filter(|d| !d.is_empty()) {
            info.push_str(&format!("\n📝 Description: {}", description));
        }

        info.push_str(&format!(
            "\n📅 Created: {}",
            self.created_at.format(DATE_FORMAT)
        ));
        info.push_str(&format!("\n📊 Status: {}", self.status()));
        info.push_str(&format!("\n🎯 Targets: {}", self.targets.len()));

        if let Some(store) = self.vulnerabilities.get() {
            info.push_str(&format!("\n🔍 Vulnerabilities: {}", store.len()));
        }

        if !self.tags.is_empty() {
            info.push_str(&format!("\n🏷️ Tags: {}", self.tags().join(", ")));
        }

        info
    }

    /// Store a freshly computed view unless an invalidation happened since
    /// `generation` was read
    fn publish(&self, generation: u64, apply: impl FnOnce(&mut ViewCache, Instant)) {
        let mut cache = self.cache.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(project = %self.name, "Skipping cache publish after concurrent mutation");
            return;
        }
        let now = Instant::now();
        apply(&mut cache, now);
        cache.last_update = Some(now);
    }

    /// Bump `last_modified`, never moving it backwards
    fn touch(&self) {
        let now = Utc::now();
        let mut last_modified = self.last_modified.write();
        if now > *last_modified {
            *last_modified = now;
        }
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Project {}

impl Hash for Project {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .field("targets", &self.targets.len())
            .field("tags", &self.tags.len())
            .field("has_store", &self.has_store())
            .finish()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Project{{name='{}', id='{}', targets={}, vulnerabilities={}}}",
            self.name,
            self.id,
            self.targets.len(),
            self.vulnerabilities.get().map_or(0, |s| s.len())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use std::collections::HashSet;
    use std::thread;

    const TEST_PROJECT_NAME: &str = "Test Project";

    fn project() -> Project {
        Project::new(TEST_PROJECT_NAME).unwrap()
    }

    fn vuln(id: &str, severity: Severity, target: &str) -> Vulnerability {
        Vulnerability::new(id, format!("Vulnerability {}", id), "Description", severity, target)
    }

    #[test]
    fn test_project_creation() {
        let project = project();
        assert_eq!(project.name(), TEST_PROJECT_NAME);
        assert_eq!(&*project.status(), "ACTIVE");
        assert_eq!(project.last_modified(), project.created_at());
        assert!(!project.id().is_empty());
        assert!(!project.has_store());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(Project::new(""), Err(CoreError::InvalidProjectName)));
        assert!(matches!(Project::new("   "), Err(CoreError::InvalidProjectName)));
    }

    #[test]
    fn test_statuses_are_pooled() {
        let a = Project::new("First").unwrap();
        let b = Project::new("Second").unwrap();
        assert!(Arc::ptr_eq(&a.status(), &b.status()));
    }

    #[test]
    fn test_free_form_values_stay_out_of_pool() {
        let before = intern::global().len();
        {
            let project = project();
            project.set_description(Some("Quarterly external assessment"));
            for i in 0..5_000 {
                project.add_target(&format!("host-{}.pool-check.example", i));
                project.add_tag(&format!("pool-check-{}", i));
            }
            project.add_vulnerability(vuln("p1", Severity::Low, "host-1.pool-check.example"));
        }

        // Other tests may pool a few statuses concurrently, never thousands
        assert!(intern::global().len() < before + 100);
    }

    #[test]
    fn test_ids_unique() {
        let ids: HashSet<String> = (0..50).map(|_| project().id().to_string()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_target_management() {
        let project = project();
        assert!(project.add_target("192.168.1.1"));
        assert!(project.add_target(" example.com "));
        assert!(!project.add_target("192.168.1.1"));
        assert_eq!(project.target_count(), 2);
        assert!(project.has_target("example.com"));

        assert!(project.remove_target("192.168.1.1"));
        assert!(!project.remove_target("192.168.1.1"));
        assert_eq!(project.targets(), vec!["example.com"]);
    }

    #[test]
    fn test_tag_management() {
        let project = project();
        assert!(project.add_tag("web"));
        assert!(project.add_tag("network"));
        assert!(!project.add_tag("WEB"));
        assert_eq!(project.tag_count(), 2);

        assert!(project.remove_tag("Web"));
        assert!(!project.remove_tag("web"));
        assert_eq!(project.tags(), vec!["network"]);
    }

    #[test]
    fn test_blank_input_is_noop() {
        let project = project();
        let before = project.last_modified();

        assert!(!project.add_target(""));
        assert!(!project.add_target("   "));
        assert!(!project.add_tag(""));
        assert!(!project.add_tag("  "));
        assert!(!project.remove_target(""));
        assert!(!project.remove_tag(" "));
        assert!(!project.add_vulnerability(None));

        assert_eq!(project.last_modified(), before);
        assert!(project.all_vulnerabilities().is_empty());
        assert!(!project.has_store());
    }

    #[test]
    fn test_vulnerability_management() {
        let project = project();
        let v = vuln("test_id", Severity::High, "test.com");
        assert!(project.add_vulnerability(v.clone()));

        let all = project.all_vulnerabilities();
        assert_eq!(all.len(), 1);
        assert_eq!(*all[0], v);

        assert_eq!(project.vulnerabilities_for_target("test.com").len(), 1);
        assert!(project.vulnerabilities_for_target("nonexistent.com").is_empty());
        assert_eq!(project.find_vulnerability("test_id").unwrap().name(), v.name());
    }

    #[test]
    fn test_empty_statistics() {
        let stats = project().statistics();
        assert_eq!(stats, ProjectStatistics::default());
        assert!(stats.severity_counts.is_empty());
    }

    #[test]
    fn test_reads_do_not_create_store() {
        let project = project();
        project.all_vulnerabilities();
        project.vulnerabilities_for_target("t1");
        project.statistics();
        project.memory_stats();
        assert!(!project.has_store());
    }

    #[test]
    fn test_statistics_by_severity_and_cve() {
        let project = project();
        project.add_vulnerability(vuln("1", Severity::High, "t1"));
        project.add_vulnerability(vuln("2", Severity::Critical, "t1").with_cve("CVE-2023-1234"));

        assert_eq!(project.vulnerabilities_for_target("t1").len(), 2);

        let stats = project.statistics();
        assert_eq!(stats.cve_count, 1);
        assert_eq!(stats.severity_count(Severity::High), 1);
        assert_eq!(stats.severity_count(Severity::Critical), 1);
        assert_eq!(stats.severity_count(Severity::Medium), 0);
        assert_eq!(stats.severity_count(Severity::Low), 0);
        assert_eq!(stats.severity_counts.len(), 4);
    }

    #[test]
    fn test_add_vulnerability_bumps_counts() {
        let project = project();
        project.add_vulnerability(vuln("1", Severity::Low, "t"));
        let before = project.statistics();

        project.add_vulnerability(vuln("2", Severity::Medium, "t"));
        let after = project.statistics();

        assert_eq!(after.vulnerability_count, before.vulnerability_count + 1);
        assert_eq!(
            after.severity_count(Severity::Medium),
            before.severity_count(Severity::Medium) + 1
        );
    }

    #[test]
    fn test_listing_copies_are_independent() {
        let project = project();
        project.add_vulnerability(vuln("1", Severity::Low, "t"));

        let mut first = project.all_vulnerabilities();
        first.clear();
        let second = project.all_vulnerabilities();

        assert_eq!(second.len(), 1);
        assert!(project.memory_stats().has_listing_cache);
    }

    #[test]
    fn test_mutation_invalidates_views() {
        let project = project();
        project.add_target("test.com");

        let listing_before = project.all_vulnerabilities();
        let stats_before = project.statistics();
        assert!(project.memory_stats().has_listing_cache);

        project.add_vulnerability(vuln("test_id", Severity::High, "test.com"));
        assert!(!project.memory_stats().has_listing_cache);
        assert!(!project.memory_stats().has_stats_cache);

        assert_ne!(listing_before.len(), project.all_vulnerabilities().len());
        assert_ne!(
            stats_before.vulnerability_count,
            project.statistics().vulnerability_count
        );
    }

    #[test]
    fn test_add_target_and_tag_invalidate_views() {
        let project = project();
        project.all_vulnerabilities();
        let stats = project.statistics();
        assert_eq!((stats.target_count, stats.tag_count), (0, 0));
        assert!(project.memory_stats().has_stats_cache);

        assert!(project.add_tag("web"));
        let memory = project.memory_stats();
        assert!(!memory.has_stats_cache);
        assert!(!memory.has_listing_cache);
        assert_eq!(project.statistics().tag_count, 1);

        assert!(project.add_target("app.example"));
        assert!(!project.memory_stats().has_stats_cache);
        let stats = project.statistics();
        assert_eq!(stats.target_count, 1);
        assert_eq!(stats.tag_count, 1);

        // Re-adding an existing member leaves the warm view alone
        assert!(!project.add_target("app.example"));
        assert!(project.memory_stats().has_stats_cache);
    }

    #[test]
    fn test_view_ages_reported() {
        let project = project();
        let memory = project.memory_stats();
        assert_eq!((memory.listing_age, memory.stats_age), (None, None));

        project.statistics();
        thread::sleep(Duration::from_millis(20));
        let memory = project.memory_stats();
        assert!(memory.listing_age.is_none());
        assert!(memory.stats_age.unwrap() >= Duration::from_millis(20));

        project.invalidate_caches();
        assert!(project.memory_stats().stats_age.is_none());
    }

    #[test]
    fn test_tag_removal_keeps_views() {
        let project = project();
        project.add_tag("web");
        let stats = project.statistics();
        assert_eq!(stats.tag_count, 1);

        assert!(project.remove_tag("web"));
        assert!(project.memory_stats().has_stats_cache);
        assert_eq!(project.statistics().tag_count, 1);

        project.invalidate_caches();
        assert_eq!(project.statistics().tag_count, 0);
    }

    #[test]
    fn test_target_removal_invalidates_views() {
        let project = project();
        project.add_target("a");
        assert_eq!(project.statistics().target_count, 1);

        project.remove_target("a");
        assert!(!project.memory_stats().has_stats_cache);
        assert_eq!(project.statistics().target_count, 0);
    }

    #[test]
    fn test_zero_ttl_never_serves_cache() {
        let project = Project::with_config(
            TEST_PROJECT_NAME,
            ProjectConfig {
                cache_ttl: Duration::ZERO,
            },
        )
        .unwrap();
        project.add_tag("web");
        assert_eq!(project.statistics().tag_count, 1);

        // Tag removal leaves the cached view in place, but it is already stale
        project.remove_tag("web");
        assert_eq!(project.statistics().tag_count, 0);
    }

    #[test]
    fn test_ttl_expiry() {
        let project = Project::with_config(
            TEST_PROJECT_NAME,
            ProjectConfig {
                cache_ttl: Duration::from_millis(200),
            },
        )
        .unwrap();
        project.add_tag("web");
        project.statistics();
        project.remove_tag("web");
        assert_eq!(project.statistics().tag_count, 1);

        thread::sleep(Duration::from_millis(250));
        assert_eq!(project.statistics().tag_count, 0);
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let project = project();
        project.invalidate_caches();
        project.invalidate_caches();
        let stats = project.memory_stats();
        assert!(!stats.has_listing_cache);
        assert!(!stats.has_stats_cache);
    }

    #[test]
    fn test_reclaim_memory_keeps_records() {
        let project = project();
        for i in 0..100 {
            project.add_target(&format!("target{}.com", i));
            project.add_tag(&format!("tag{}", i));
            project.add_vulnerability(vuln(&format!("id{}", i), Severity::Medium, &format!("target{}.com", i)));
        }
        project.all_vulnerabilities();
        project.statistics();

        project.reclaim_memory();

        let stats = project.memory_stats();
        assert!(!stats.has_listing_cache);
        assert!(!stats.has_stats_cache);
        assert_eq!(stats.store.unwrap().record_count, 100);
        assert_eq!(project.all_vulnerabilities().len(), 100);
    }

    #[test]
    fn test_setters_bump_last_modified() {
        let project = project();
        let created = project.created_at();

        project.set_description(Some("Test project description"));
        project.set_scope(Some("internal network"));
        project.set_created_by(Some("alice"));
        project.set_notes(Some("kickoff on monday"));
        assert!(project.set_status("on_hold"));
        assert!(!project.set_status("  "));

        assert_eq!(&*project.status(), "ON_HOLD");
        assert_eq!(project.description().as_deref(), Some("Test project description"));
        assert_eq!(project.scope().as_deref(), Some("internal network"));
        assert_eq!(project.created_by().as_deref(), Some("alice"));
        assert_eq!(project.notes().as_deref(), Some("kickoff on monday"));
        assert!(project.last_modified() >= created);
    }

    #[test]
    fn test_equality_by_id() {
        let a = Project::new("Test Project 1").unwrap();
        let b = Project::new("Test Project 2").unwrap();
        let c = Project::new("Test Project 1").unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a);

        let restored = Project::from_snapshot(a.snapshot(), ProjectConfig::default()).unwrap();
        assert_eq!(a, restored);
    }

    #[test]
    fn test_formatted_info_and_display() {
        let project = project();
        project.set_description(Some("Test project description"));
        project.add_target("example.com");
        project.add_tag("web");
        project.add_vulnerability(vuln("id1", Severity::High, "example.com"));

        let info = project.formatted_info();
        assert!(info.contains(TEST_PROJECT_NAME));
        assert!(info.contains("Test project description"));
        assert!(info.contains("Vulnerabilities: 1"));
        assert!(info.contains("web"));

        let shown = project.to_string();
        assert!(shown.contains("Project{"));
        assert!(shown.contains("targets=1"));
        assert!(shown.contains("vulnerabilities=1"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let project = project();
        project.add_target("10.0.0.1");
        project.add_tag("internal");
        project.set_notes(Some("vpn required"));
        project.add_vulnerability(vuln("a", Severity::Critical, "10.0.0.1").with_cve("CVE-2021-44228"));

        let restored = Project::from_snapshot(project.snapshot(), ProjectConfig::default()).unwrap();

        assert_eq!(restored.id(), project.id());
        assert_eq!(restored.created_at(), project.created_at());
        assert_eq!(restored.last_modified(), project.last_modified());
        assert_eq!(restored.targets(), project.targets());
        assert_eq!(restored.tags(), project.tags());
        assert_eq!(restored.notes().as_deref(), Some("vpn required"));
        assert_eq!(restored.statistics(), project.statistics());
    }

    #[test]
    fn test_empty_snapshot_restores_without_store() {
        let project = project();
        let restored = Project::from_snapshot(project.snapshot(), ProjectConfig::default()).unwrap();
        assert!(!restored.has_store());
        assert!(restored.statistics().severity_counts.is_empty());
    }

    #[test]
    fn test_lazy_store_single_instance() {
        let project = Arc::new(project());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let project = Arc::clone(&project);
                thread::spawn(move || project.vulnerabilities() as *const VulnerabilityStore as usize)
            })
            .collect();

        let addresses: HashSet<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(addresses.len(), 1);
    }
}
