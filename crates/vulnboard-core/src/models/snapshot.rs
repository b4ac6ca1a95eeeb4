//! Serializable forms of a project, used by the registry for persistence

use super::Vulnerability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full point-in-time copy of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Lightweight index entry describing a project without loading it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub status: String,
    pub target_count: usize,
    pub vulnerability_count: usize,
}

impl From<&ProjectSnapshot> for ProjectMetadata {
    fn from(snapshot: &ProjectSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            created_at: snapshot.created_at,
            last_modified: snapshot.last_modified,
            status: snapshot.status.clone(),
            target_count: snapshot.targets.len(),
            vulnerability_count: snapshot.vulnerabilities.len(),
        }
    }
}
