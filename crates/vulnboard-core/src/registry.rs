//! Project registry with moka-backed loading
//!
//! Tracks every known project by name. Loaded projects live in a
//! `moka::sync::Cache`; when the registry is backed by a data directory the
//! cache is bounded and idle projects are written back to disk on eviction and
//! reloaded on demand. In-memory registries never evict.

use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::event::{EventBus, RegistryEvent};
use crate::intern::{self, PoolStats};
use crate::models::ProjectMetadata;
use crate::persist;
use crate::project::Project;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry-wide diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub known_projects: usize,
    pub loaded_projects: u64,
    pub string_pool: PoolStats,
}

/// Name index shared with the eviction listener
///
/// Every disk write goes through `write_lock`: a snapshot is taken, written
/// and folded into `index.json` as one step, so a later save can never be
/// overwritten by an earlier one.
struct ProjectIndex {
    entries: DashMap<String, ProjectMetadata>,
    write_lock: Mutex<()>,
}

impl ProjectIndex {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Update the entry for a still-known project; removed projects stay removed
    fn refresh(&self, metadata: ProjectMetadata) -> bool {
        match self.entries.get_mut(&metadata.name) {
            Some(mut entry) => {
                *entry = metadata;
                true
            }
            None => false,
        }
    }

    /// Write the projects' snapshots, then the index. Projects removed in the
    /// meantime are skipped.
    fn save(&self, dir: &Path, projects: &[Arc<Project>]) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock();
        let mut changed = false;
        for project in projects {
            if !self.entries.contains_key(project.name()) {
                continue;
            }
            let snapshot = project.snapshot();
            persist::write_snapshot(dir, &snapshot)?;
            changed |= self.refresh(ProjectMetadata::from(&snapshot));
        }
        if changed {
            self.write_entries(dir)?;
        }
        Ok(())
    }

    /// Delete a removed project's snapshot and rewrite the index
    fn forget(&self, dir: &Path, project_id: &str) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock();
        persist::remove_snapshot(dir, project_id)?;
        self.write_entries(dir)
    }

    /// Caller holds `write_lock`
    fn write_entries(&self, dir: &Path) -> Result<(), CoreError> {
        let mut entries: Vec<ProjectMetadata> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        persist::write_index(dir, &entries)
    }
}

/// Named collection of projects with an optional on-disk home
pub struct ProjectRegistry {
    config: RegistryConfig,

    /// Root of the on-disk layout (None = in-memory only)
    data_dir: Option<PathBuf>,

    /// Every known project, loaded or not
    index: Arc<ProjectIndex>,

    /// Projects currently in memory, keyed by name
    loaded: Cache<String, Arc<Project>>,

    /// Project selected with `open_project`
    current: RwLock<Option<Arc<Project>>>,

    event_bus: EventBus,
}

impl ProjectRegistry {
    /// Registry without persistence; projects are never evicted
    pub fn in_memory(config: RegistryConfig) -> Self {
        Self {
            config,
            data_dir: None,
            index: Arc::new(ProjectIndex::new()),
            loaded: Cache::builder().build(),
            current: RwLock::new(None),
            event_bus: EventBus::default(),
        }
    }

    /// Open (or initialize) a registry rooted at `data_dir`
    pub fn open(data_dir: impl Into<PathBuf>, config: RegistryConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let data_dir = data_dir.into();
        persist::ensure_layout(&data_dir)?;

        let index = Arc::new(ProjectIndex::new());
        for entry in persist::read_index(&data_dir)? {
            index.entries.insert(entry.name.clone(), entry);
        }

        let event_bus = EventBus::default();
        let listener_dir = data_dir.clone();
        let listener_index = Arc::clone(&index);
        let listener_bus = event_bus.clone();

        let loaded = Cache::builder()
            .max_capacity(config.max_loaded_projects)
            .time_to_idle(config.idle_eviction())
            .eviction_listener(move |name: Arc<String>, project: Arc<Project>, cause| {
                if !matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    return;
                }
                match listener_index.save(&listener_dir, &[Arc::clone(&project)]) {
                    Ok(()) => {
                        debug!(project = %name, ?cause, "Evicted project written back");
                        listener_bus.publish(RegistryEvent::ProjectEvicted(name.to_string()));
                    }
                    Err(e) => {
                        warn!(project = %name, error = %e, "Failed to write back evicted project");
                    }
                }
            })
            .build();

        info!(
            data_dir = %data_dir.display(),
            projects = index.entries.len(),
            "Project registry opened"
        );

        Ok(Self {
            config,
            data_dir: Some(data_dir),
            index,
            loaded,
            current: RwLock::new(None),
            event_bus,
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ===================
    // Lifecycle
    // ===================

    /// Create a project; names are unique within the registry
    pub fn create_project(&self, name: &str) -> Result<Arc<Project>, CoreError> {
        let project = Arc::new(Project::with_config(name, self.config.project_config())?);
        let name = project.name().to_string();

        match self.index.entries.entry(name.clone()) {
            Entry::Occupied(_) => return Err(CoreError::ProjectExists { name }),
            Entry::Vacant(entry) => {
                entry.insert(project.metadata());
            }
        }

        self.loaded.insert(name.clone(), Arc::clone(&project));

        if let Some(dir) = &self.data_dir {
            self.index.save(dir, &[Arc::clone(&project)])?;
        }

        info!(project = %name, id = project.id(), "Project created");
        self.event_bus.publish(RegistryEvent::ProjectCreated(name));
        Ok(project)
    }

    /// Fetch a project by name, loading it from disk if needed
    pub fn get_project(&self, name: &str) -> Result<Arc<Project>, CoreError> {
        let name = name.trim();

        if let Some(current) = self.current.read().as_ref() {
            if current.name() == name {
                return Ok(Arc::clone(current));
            }
        }

        if let Some(project) = self.loaded.get(name) {
            return Ok(project);
        }

        let id = self
            .index
            .entries
            .get(name)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| CoreError::ProjectNotFound {
                name: name.to_string(),
            })?;

        // Concurrent callers share a single load
        self.loaded
            .try_get_with(name.to_string(), || self.load_from_disk(name, &id))
            .map_err(|e| CoreError::ProjectLoad {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn load_from_disk(&self, name: &str, id: &str) -> Result<Arc<Project>, CoreError> {
        let Some(dir) = &self.data_dir else {
            return Err(CoreError::ProjectNotFound {
                name: name.to_string(),
            });
        };

        let snapshot = persist::read_snapshot(dir, id)?;
        let project = Project::from_snapshot(snapshot, self.config.project_config())?;
        debug!(project = %name, "Project loaded from disk");
        Ok(Arc::new(project))
    }

    /// Make `name` the current project
    pub fn open_project(&self, name: &str) -> Result<Arc<Project>, CoreError> {
        let project = self.get_project(name)?;
        *self.current.write() = Some(Arc::clone(&project));
        self.event_bus
            .publish(RegistryEvent::ProjectOpened(project.name().to_string()));
        Ok(project)
    }

    pub fn current_project(&self) -> Option<Arc<Project>> {
        self.current.read().clone()
    }

    /// Close the current project, saving it first when persisted
    pub fn close_current_project(&self) -> Result<Option<Arc<Project>>, CoreError> {
        let Some(project) = self.current.write().take() else {
            return Ok(None);
        };

        if self.data_dir.is_some() {
            self.save(&project)?;
        }
        self.event_bus
            .publish(RegistryEvent::ProjectClosed(project.name().to_string()));
        Ok(Some(project))
    }

    /// Forget a project and delete its snapshot
    pub fn remove_project(&self, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        let (_, metadata) = self
            .index
            .entries
            .remove(name)
            .ok_or_else(|| CoreError::ProjectNotFound {
                name: name.to_string(),
            })?;

        self.loaded.invalidate(name);
        {
            let mut current = self.current.write();
            if current.as_ref().is_some_and(|p| p.name() == name) {
                *current = None;
            }
        }

        if let Some(dir) = &self.data_dir {
            self.index.forget(dir, &metadata.id)?;
        }

        info!(project = %name, "Project removed");
        self.event_bus
            .publish(RegistryEvent::ProjectRemoved(name.to_string()));
        Ok(())
    }

    // ===================
    // Queries
    // ===================

    pub fn contains(&self, name: &str) -> bool {
        self.index.entries.contains_key(name.trim())
    }

    /// Known project names, sorted
    pub fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Metadata for every known project (live values for loaded ones), sorted by name
    pub fn project_metadata(&self) -> Vec<ProjectMetadata> {
        let mut entries: Vec<ProjectMetadata> = self
            .index
            .entries
            .iter()
            .map(|entry| match self.loaded.get(entry.key()) {
                Some(project) => project.metadata(),
                None => entry.value().clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    // ===================
    // Persistence
    // ===================

    /// Write one loaded project to disk. No-op for in-memory registries or
    /// projects that are not loaded (their snapshot is already current).
    pub fn save_project(&self, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        if !self.index.entries.contains_key(name) {
            return Err(CoreError::ProjectNotFound {
                name: name.to_string(),
            });
        }
        if self.data_dir.is_none() {
            return Ok(());
        }

        if let Some(project) = self.loaded.get(name) {
            self.save(&project)?;
        }
        Ok(())
    }

    /// Write every loaded project and the index; returns the number saved
    pub fn save_all(&self) -> Result<usize, CoreError> {
        let Some(dir) = &self.data_dir else {
            return Ok(0);
        };

        let projects: Vec<Arc<Project>> = self.loaded.iter().map(|(_, p)| p).collect();
        self.index.save(dir, &projects)?;
        for project in &projects {
            self.event_bus
                .publish(RegistryEvent::ProjectSaved(project.name().to_string()));
        }

        info!(saved = projects.len(), "Registry saved");
        Ok(projects.len())
    }

    fn save(&self, project: &Arc<Project>) -> Result<(), CoreError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        self.index.save(dir, std::slice::from_ref(project))?;

        debug!(project = project.name(), "Project saved");
        self.event_bus
            .publish(RegistryEvent::ProjectSaved(project.name().to_string()));
        Ok(())
    }

    // ===================
    // Memory
    // ===================

    /// Drop cached views in every loaded project, flush pending evictions and
    /// prune pooled strings no project still uses
    pub fn reclaim_memory(&self) {
        for (_, project) in self.loaded.iter() {
            project.reclaim_memory();
        }
        self.loaded.run_pending_tasks();
        let pruned = intern::global().prune();
        debug!(
            loaded = self.loaded.entry_count(),
            pruned,
            "Registry memory reclaimed"
        );
    }

    pub fn memory_stats(&self) -> RegistryStats {
        self.loaded.run_pending_tasks();
        RegistryStats {
            known_projects: self.index.entries.len(),
            loaded_projects: self.loaded.entry_count(),
            string_pool: intern::global().stats(),
        }
    }
}
