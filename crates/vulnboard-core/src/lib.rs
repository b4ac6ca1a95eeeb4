//! vulnboard-core - Core library for vulnboard
//!
//! Provides the project model, the indexed vulnerability store, TTL-cached
//! project views, string interning, and a persistent project registry.

pub mod config;
pub mod cve;
pub mod error;
pub mod event;
pub mod intern;
pub mod models;
pub mod persist;
pub mod project;
pub mod registry;
pub mod store;

pub use config::{ProjectConfig, RegistryConfig};
pub use error::CoreError;
pub use event::{EventBus, EventReceiver, RegistryEvent, EVENT_CAPACITY};
pub use intern::{PoolStats, StringPool};
pub use models::{
    MemoryStats, ProjectMetadata, ProjectSnapshot, ProjectStatistics, Severity, Vulnerability,
};
pub use project::Project;
pub use registry::{ProjectRegistry, RegistryStats};
pub use store::{StoreFootprint, VulnerabilityStore};
