//! Vulnerability record

use super::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single finding stored under a project
///
/// `id`, `name` and `target` are fixed at construction. Severity, CVE and
/// description can be adjusted before the record is handed to a store;
/// stored records are shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    id: String,
    name: String,
    description: String,
    severity: Severity,
    target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cve_id: Option<String>,
}

impl Vulnerability {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            severity,
            target: target.into(),
            cve_id: None,
        }
    }

    /// Builder-style CVE assignment
    pub fn with_cve(mut self, cve_id: impl Into<String>) -> Self {
        self.set_cve_id(Some(cve_id.into()));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn cve_id(&self) -> Option<&str> {
        self.cve_id.as_deref()
    }

    /// True when a non-blank CVE identifier is attached
    pub fn has_cve(&self) -> bool {
        self.cve_id
            .as_deref()
            .is_some_and(|cve| !cve.trim().is_empty())
    }

    pub fn set_severity(&mut self, severity: Severity) {
        self.severity = severity;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_cve_id(&mut self, cve_id: Option<String>) {
        self.cve_id = cve_id.filter(|cve| !cve.trim().is_empty());
    }
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.severity.icon(), self.name, self.target)?;
        if let Some(cve) = &self.cve_id {
            write!(f, " ({})", cve)?;
        }
        Ok(())
    }
}
