//! On-disk layout for the project registry
//!
//! ```text
//! <data_dir>/index.json            list of ProjectMetadata
//! <data_dir>/projects/<id>.json    one ProjectSnapshot per project
//! ```
//!
//! Every write goes to its own temporary sibling and is renamed into place, so
//! concurrent writers of the same file never trip over each other.

use crate::error::CoreError;
use crate::models::{ProjectMetadata, ProjectSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const INDEX_FILE: &str = "index.json";
const PROJECTS_DIR: &str = "projects";

pub fn index_path(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_FILE)
}

pub fn snapshot_path(data_dir: &Path, project_id: &str) -> PathBuf {
    data_dir.join(PROJECTS_DIR).join(format!("{}.json", project_id))
}

/// Create the data directory layout if missing
pub fn ensure_layout(data_dir: &Path) -> Result<(), CoreError> {
    let projects = data_dir.join(PROJECTS_DIR);
    std::fs::create_dir_all(&projects).map_err(|source| CoreError::FileWrite {
        path: projects,
        source,
    })
}

/// Read the index; a missing file means an empty registry
pub fn read_index(data_dir: &Path) -> Result<Vec<ProjectMetadata>, CoreError> {
    let path = index_path(data_dir);
    if !path.exists() {
        debug!(path = %path.display(), "No registry index yet");
        return Ok(Vec::new());
    }
    read_json(&path)
}

pub fn write_index(data_dir: &Path, entries: &[ProjectMetadata]) -> Result<(), CoreError> {
    write_json(&index_path(data_dir), entries)
}

pub fn read_snapshot(data_dir: &Path, project_id: &str) -> Result<ProjectSnapshot, CoreError> {
    read_json(&snapshot_path(data_dir, project_id))
}

pub fn write_snapshot(data_dir: &Path, snapshot: &ProjectSnapshot) -> Result<(), CoreError> {
    write_json(&snapshot_path(data_dir, &snapshot.id), snapshot)
}

/// Delete a snapshot file; already-absent files are fine
pub fn remove_snapshot(data_dir: &Path, project_id: &str) -> Result<(), CoreError> {
    let path = snapshot_path(data_dir, project_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::FileWrite { path, source }),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| CoreError::JsonParse {
        path: path.to_path_buf(),
        message: source.to_string(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| CoreError::JsonParse {
        path: path.to_path_buf(),
        message: source.to_string(),
        source,
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| CoreError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&content).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::models::{Severity, Vulnerability};
    use crate::project::Project;
    use tempfile::tempdir;

    #[test]
    fn test_missing_index_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_index(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_write_read() {
        let dir = tempdir().unwrap();
        ensure_layout(dir.path()).unwrap();

        let project = Project::new("Persisted").unwrap();
        project.add_target("db.internal");
        project.add_vulnerability(Vulnerability::new(
            "v1",
            "Default credentials",
            "admin/admin",
            Severity::High,
            "db.internal",
        ));

        write_snapshot(dir.path(), &project.snapshot()).unwrap();
        let snapshot = read_snapshot(dir.path(), project.id()).unwrap();
        assert_eq!(snapshot, project.snapshot());

        let restored = Project::from_snapshot(snapshot, ProjectConfig::default()).unwrap();
        assert_eq!(restored.all_vulnerabilities().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path().join(PROJECTS_DIR)).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_writes_same_file() {
        let dir = tempdir().unwrap();
        ensure_layout(dir.path()).unwrap();
        let project = Project::new("Contended").unwrap();
        project.add_target("db.internal");
        let snapshot = project.snapshot();
        let entries = vec![project.metadata()];

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        for _ in 0..50 {
                            write_snapshot(dir.path(), &snapshot)?;
                            write_index(dir.path(), &entries)?;
                        }
                        Ok::<(), CoreError>(())
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        assert_eq!(read_snapshot(dir.path(), project.id()).unwrap(), snapshot);
        assert_eq!(read_index(dir.path()).unwrap(), entries);
        // Only the snapshot itself is left in the projects directory
        assert_eq!(std::fs::read_dir(dir.path().join(PROJECTS_DIR)).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_reports_json_error() {
        let dir = tempdir().unwrap();
        ensure_layout(dir.path()).unwrap();
        std::fs::write(snapshot_path(dir.path(), "broken"), "{ not json").unwrap();

        assert!(matches!(
            read_snapshot(dir.path(), "broken"),
            Err(CoreError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_remove_missing_snapshot_ok() {
        let dir = tempdir().unwrap();
        ensure_layout(dir.path()).unwrap();
        assert!(remove_snapshot(dir.path(), "never-written").is_ok());
    }
}
