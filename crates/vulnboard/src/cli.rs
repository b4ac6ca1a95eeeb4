//! CLI helpers: lookups and table/JSON formatters
//!
//! Everything here is pure over core types so the command handlers in
//! `main.rs` stay thin.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use std::sync::Arc;
use vulnboard_core::{ProjectMetadata, ProjectStatistics, Severity, Vulnerability};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    NoSuchVulnerability { project: String, id: String },
    NoSuchTarget { project: String, target: String },
    Core(vulnboard_core::CoreError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NoSuchVulnerability { project, id } => {
                write!(f, "No vulnerability '{}' in project '{}'", id, project)
            }
            CliError::NoSuchTarget { project, target } => {
                write!(f, "Target '{}' is not in project '{}'", target, project)
            }
            CliError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<vulnboard_core::CoreError> for CliError {
    fn from(e: vulnboard_core::CoreError) -> Self {
        CliError::Core(e)
    }
}

impl CliError {
    pub fn hint(&self) -> Option<String> {
        match self {
            CliError::NoSuchVulnerability { project, .. } => {
                Some(format!("List findings with: vulnboard vulns \"{}\"", project))
            }
            CliError::NoSuchTarget { project, target } => Some(format!(
                "Add it first: vulnboard add-target \"{}\" {}",
                project, target
            )),
            CliError::Core(e) => e.suggestion(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a severity flag; accepts any case
pub fn parse_severity(value: &str) -> Result<Severity, CliError> {
    Ok(value.parse::<Severity>()?)
}

/// Keep only records at or above `min`
pub fn filter_min_severity(
    records: Vec<Arc<Vulnerability>>,
    min: Option<Severity>,
) -> Vec<Arc<Vulnerability>> {
    match min {
        Some(min) => records.into_iter().filter(|v| v.severity() >= min).collect(),
        None => records,
    }
}

// ============================================================================
// Formatters
// ============================================================================

fn header(table: &mut Table, columns: &[&str], no_color: bool) {
    if no_color {
        table.set_header(columns.to_vec());
    } else {
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Magenta,
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Green,
    }
}

/// Format project list as table (human) or JSON
pub fn format_project_table(projects: &[ProjectMetadata], json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(projects).unwrap_or_else(|_| "[]".to_string());
    }

    if projects.is_empty() {
        return "No projects yet. Create one with: vulnboard create <name>".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(
        &mut table,
        &["Name", "Status", "Targets", "Findings", "Modified", "ID"],
        no_color,
    );

    for project in projects {
        table.add_row(Row::from(vec![
            truncate(&project.name, 30),
            project.status.clone(),
            project.target_count.to_string(),
            project.vulnerability_count.to_string(),
            project.last_modified.format(DATE_FORMAT).to_string(),
            project.id[..8.min(project.id.len())].to_string(),
        ]));
    }

    table.to_string()
}

/// Format vulnerabilities as table (human) or JSON, most severe first
pub fn format_vulnerability_table(
    records: &[Arc<Vulnerability>],
    json: bool,
    no_color: bool,
) -> String {
    let mut sorted: Vec<&Arc<Vulnerability>> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity()
            .cmp(&a.severity())
            .then_with(|| a.target().cmp(b.target()))
            .then_with(|| a.id().cmp(b.id()))
    });

    if json {
        let plain: Vec<&Vulnerability> = sorted.iter().map(|v| v.as_ref()).collect();
        return serde_json::to_string_pretty(&plain).unwrap_or_else(|_| "[]".to_string());
    }

    if sorted.is_empty() {
        return "No vulnerabilities recorded.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, &["Severity", "ID", "Name", "Target", "CVE"], no_color);

    for record in sorted {
        let severity = format!("{} {}", record.severity().icon(), record.severity());
        let severity = if no_color {
            Cell::new(severity)
        } else {
            Cell::new(severity).fg(severity_color(record.severity()))
        };

        table.add_row(Row::from(vec![
            severity,
            Cell::new(truncate(record.id(), 12)),
            Cell::new(truncate(record.name(), 50)),
            Cell::new(record.target()),
            Cell::new(record.cve_id().unwrap_or("-")),
        ]));
    }

    table.to_string()
}

/// Format project statistics (human or JSON)
pub fn format_statistics(name: &str, stats: &ProjectStatistics, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_string());
    }

    let mut lines = vec![];
    lines.push(format!("vulnboard - {}", name));
    lines.push("=".repeat(12 + name.chars().count()));
    lines.push(format!("Targets:          {}", stats.target_count));
    lines.push(format!("Tags:             {}", stats.tag_count));
    lines.push(format!("Vulnerabilities:  {}", stats.vulnerability_count));
    lines.push(format!("With CVE:         {}", stats.cve_count));

    if stats.vulnerability_count > 0 {
        lines.push(String::new());
        lines.push("By severity:".to_string());
        for severity in Severity::ALL.iter().rev() {
            let count = stats.severity_count(*severity);
            lines.push(format!(
                "  {} {:<10} {:>5}  ({:.0}%)",
                severity.icon(),
                severity.display_name(),
                count,
                percent(count, stats.vulnerability_count)
            ));
        }
    }

    lines.join("\n")
}

// ============================================================================
// Utilities
// ============================================================================

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================
