//! Data models for vulnboard

pub mod severity;
pub mod snapshot;
pub mod statistics;
pub mod vulnerability;

pub use severity::Severity;
pub use snapshot::{ProjectMetadata, ProjectSnapshot};
pub use statistics::{MemoryStats, ProjectStatistics};
pub use vulnerability::Vulnerability;
