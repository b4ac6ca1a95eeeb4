//! Error types for vulnboard-core
//!
//! No-op conditions (blank targets or tags, missing records, removing an absent
//! member) are reported through `bool` results and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for vulnboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Input Errors
    // ===================
    #[error("Project name cannot be empty")]
    InvalidProjectName,

    #[error("Unknown severity level: {value}")]
    InvalidSeverity { value: String },

    // ===================
    // Registry Errors
    // ===================
    #[error("Project already exists: {name}")]
    ProjectExists { name: String },

    #[error("Project not found: {name}")]
    ProjectNotFound { name: String },

    #[error("Failed to load project {name}: {reason}")]
    ProjectLoad { name: String, reason: String },

    // ===================
    // Persistence Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Actionable hint for the CLI, when one exists
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CoreError::ProjectNotFound { .. } => {
                Some("List known projects with: vulnboard list".to_string())
            }
            CoreError::ProjectExists { name } => {
                Some(format!("Open the existing project: vulnboard info \"{}\"", name))
            }
            CoreError::InvalidSeverity { .. } => {
                Some("Use one of: low, medium, high, critical".to_string())
            }
            CoreError::DirectoryNotFound { path } => {
                Some(format!("Create directory: mkdir -p {}", path.display()))
            }
            CoreError::JsonParse { path, .. } => Some(format!(
                "Validate JSON syntax with: jq . {}",
                path.display()
            )),
            _ => None,
        }
    }
}
