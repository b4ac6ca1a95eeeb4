//! vulnboard - Penetration-test project tracker

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::CliError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vulnboard_core::{
    cve, event, CoreError, EventReceiver, ProjectRegistry, RegistryConfig, Vulnerability,
};

const CONFIG_FILE: &str = "config.toml";

#[derive(Parser)]
#[command(
    name = "vulnboard",
    version,
    about = "Track targets, tags and findings for security assessments",
    long_about = "Keeps one project per engagement: its targets, tags and vulnerability\n\
                  records, with cached listings and statistics.\n\
                  \n\
                  Examples:\n\
                    vulnboard create \"Acme External\"                  # New project\n\
                    vulnboard add-target \"Acme External\" 10.0.0.5     # Add a target\n\
                    vulnboard add-vuln \"Acme External\" --target 10.0.0.5 \\\n\
                        --severity high --description \"Log4Shell CVE-2021-44228\"\n\
                    vulnboard vulns \"Acme External\" --min-severity high\n\
                    vulnboard stats \"Acme External\" --json\n\
                  \n\
                  Environment Variables:\n\
                    VULNBOARD_HOME                   # Override data directory\n\
                    VULNBOARD_CONFIG                 # Path to config.toml\n\
                    VULNBOARD_NO_COLOR               # Disable ANSI colors\n\
                    RUST_LOG                         # Override log filter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (default: platform data dir + /vulnboard)
    #[arg(long, env = "VULNBOARD_HOME", global = true)]
    data_dir: Option<PathBuf>,

    /// Registry config file (default: <data-dir>/config.toml if present)
    #[arg(long, env = "VULNBOARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "VULNBOARD_NO_COLOR", global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// List known projects
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show project summary
    Info { project: String },
    /// Update project status or details
    Update {
        project: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add one or more targets
    AddTarget {
        project: String,
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Remove a target
    RemoveTarget { project: String, target: String },
    /// Add one or more tags
    AddTag {
        project: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Remove a tag
    RemoveTag { project: String, tag: String },
    /// Record a vulnerability
    AddVuln {
        project: String,
        /// Affected target (added to the project if missing)
        #[arg(long, short = 't')]
        target: String,
        /// low, medium, high or critical
        #[arg(long, short = 's', default_value = "medium")]
        severity: String,
        /// Record id (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Display name (default: derived from CVE or description)
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// CVE identifier (default: detected in name or description)
        #[arg(long)]
        cve: Option<String>,
    },
    /// List vulnerabilities
    Vulns {
        project: String,
        /// Only records for this target
        #[arg(long, short = 't')]
        target: Option<String>,
        /// Only records at or above this severity
        #[arg(long)]
        min_severity: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one vulnerability
    Show {
        project: String,
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Print project statistics
    Stats {
        project: String,
        #[arg(long)]
        json: bool,
    },
    /// Print memory diagnostics
    Memory { project: Option<String> },
    /// Delete a project
    Remove { project: String },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = hint_for(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn hint_for(error: &anyhow::Error) -> Option<String> {
    if let Some(e) = error.downcast_ref::<CliError>() {
        return e.hint();
    }
    error.downcast_ref::<CoreError>().and_then(|e| e.suggestion())
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("vulnboard=warn,vulnboard_core=warn"),
        1 => EnvFilter::new("vulnboard=info,vulnboard_core=info"),
        _ => EnvFilter::new("vulnboard=debug,vulnboard_core=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .without_time()
        .init();

    let data_dir = cli
        .data_dir
        .or_else(|| dirs::data_dir().map(|d| d.join("vulnboard")))
        .context("Could not determine data directory")?;
    let config = load_config(cli.config.as_deref(), &data_dir)?;
    let registry = ProjectRegistry::open(&data_dir, config)?;
    let mut events = registry.event_bus().subscribe();

    let outcome = dispatch(&registry, cli.command, cli.no_color);
    report_events(&mut events);
    outcome
}

/// Log what the command did to the registry (visible with -v)
fn report_events(events: &mut EventReceiver) {
    for event in event::drain(events) {
        info!(project = event.project(), "Project {}", event.kind());
    }
}

fn dispatch(registry: &ProjectRegistry, command: Commands, no_color: bool) -> Result<()> {
    match command {
        Commands::Create {
            name,
            description,
            scope,
            created_by,
        } => run_create(registry, &name, description, scope, created_by)?,
        Commands::List { json } => {
            println!(
                "{}",
                cli::format_project_table(&registry.project_metadata(), json, no_color)
            );
        }
        Commands::Info { project } => {
            println!("{}", registry.get_project(&project)?.formatted_info());
        }
        Commands::Update {
            project,
            status,
            description,
            scope,
            notes,
        } => run_update(registry, &project, status, description, scope, notes)?,
        Commands::AddTarget { project, targets } => {
            let p = registry.get_project(&project)?;
            let added = targets.iter().filter(|t| p.add_target(t)).count();
            registry.save_project(&project)?;
            println!("Added {} of {} target(s) to {}", added, targets.len(), p.name());
        }
        Commands::RemoveTarget { project, target } => {
            let p = registry.get_project(&project)?;
            if !p.remove_target(&target) {
                return Err(CliError::NoSuchTarget { project, target }.into());
            }
            registry.save_project(&project)?;
            println!("Removed target {} from {}", target.trim(), p.name());
        }
        Commands::AddTag { project, tags } => {
            let p = registry.get_project(&project)?;
            let added = tags.iter().filter(|t| p.add_tag(t)).count();
            registry.save_project(&project)?;
            println!("Added {} of {} tag(s) to {}", added, tags.len(), p.name());
        }
        Commands::RemoveTag { project, tag } => {
            let p = registry.get_project(&project)?;
            let removed = p.remove_tag(&tag);
            registry.save_project(&project)?;
            if removed {
                println!("Removed tag {} from {}", tag.trim(), p.name());
            } else {
                println!("Tag {} was not set on {}", tag.trim(), p.name());
            }
        }
        Commands::AddVuln {
            project,
            target,
            severity,
            id,
            name,
            description,
            cve,
        } => run_add_vuln(
            registry,
            &project,
            VulnArgs {
                target,
                severity,
                id,
                name,
                description,
                cve,
            },
        )?,
        Commands::Vulns {
            project,
            target,
            min_severity,
            json,
        } => {
            let p = registry.get_project(&project)?;
            let min = min_severity.as_deref().map(cli::parse_severity).transpose()?;
            let records = match target {
                Some(target) => p.vulnerabilities_for_target(target.trim()),
                None => p.all_vulnerabilities(),
            };
            let records = cli::filter_min_severity(records, min);
            println!("{}", cli::format_vulnerability_table(&records, json, no_color));
        }
        Commands::Show { project, id, json } => {
            let p = registry.get_project(&project)?;
            let record = p
                .find_vulnerability(&id)
                .ok_or(CliError::NoSuchVulnerability { project, id })?;
            if json {
                println!("{}", serde_json::to_string_pretty(record.as_ref())?);
            } else {
                println!("{}", record);
                if !record.description().is_empty() {
                    println!("\n{}", record.description());
                }
            }
        }
        Commands::Stats { project, json } => {
            let p = registry.get_project(&project)?;
            println!("{}", cli::format_statistics(p.name(), &p.statistics(), json));
        }
        Commands::Memory { project } => run_memory(registry, project.as_deref())?,
        Commands::Remove { project } => {
            registry.remove_project(&project)?;
            println!("Removed project {}", project.trim());
        }
    }

    Ok(())
}

/// Explicit `--config`, else `<data_dir>/config.toml` when present, else defaults
fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<RegistryConfig> {
    if let Some(path) = explicit {
        return RegistryConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = data_dir.join(CONFIG_FILE);
    if default_path.exists() {
        debug!(path = %default_path.display(), "Using config from data directory");
        return Ok(RegistryConfig::load(&default_path)?);
    }

    Ok(RegistryConfig::default())
}

fn run_create(
    registry: &ProjectRegistry,
    name: &str,
    description: Option<String>,
    scope: Option<String>,
    created_by: Option<String>,
) -> Result<()> {
    let project = registry.create_project(name)?;
    project.set_description(description.as_deref());
    project.set_scope(scope.as_deref());
    project.set_created_by(created_by.as_deref());
    registry.save_project(project.name())?;

    println!("{}", project.formatted_info());
    Ok(())
}

fn run_update(
    registry: &ProjectRegistry,
    name: &str,
    status: Option<String>,
    description: Option<String>,
    scope: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let project = registry.get_project(name)?;

    if let Some(status) = status {
        project.set_status(&status);
    }
    if let Some(description) = description {
        project.set_description(Some(&description));
    }
    if let Some(scope) = scope {
        project.set_scope(Some(&scope));
    }
    if let Some(notes) = notes {
        project.set_notes(Some(&notes));
    }
    registry.save_project(name)?;

    println!("{}", project.formatted_info());
    Ok(())
}

struct VulnArgs {
    target: String,
    severity: String,
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    cve: Option<String>,
}

fn run_add_vuln(registry: &ProjectRegistry, project_name: &str, args: VulnArgs) -> Result<()> {
    let project = registry.get_project(project_name)?;
    let severity = cli::parse_severity(&args.severity)?;
    let target = args.target.trim();

    if project.add_target(target) {
        debug!(target, "Target added with vulnerability");
    }

    let cve_id = cve::determine_cve_id(
        args.cve.as_deref(),
        args.name.as_deref(),
        args.description.as_deref(),
    );
    let name = cve::determine_best_name(
        cve_id.as_deref(),
        args.name.as_deref(),
        args.description.as_deref(),
        Some(target),
    );
    let id = args
        .id
        .unwrap_or_else(|| format!("VULN-{}", &Uuid::new_v4().simple().to_string()[..8]));

    let mut record = Vulnerability::new(
        id,
        name,
        args.description.unwrap_or_default(),
        severity,
        target,
    );
    record.set_cve_id(cve_id);

    println!("Recorded {}", record);
    project.add_vulnerability(record);
    registry.save_project(project_name)?;
    Ok(())
}

fn run_memory(registry: &ProjectRegistry, project: Option<&str>) -> Result<()> {
    let stats = registry.memory_stats();
    println!("Known projects:   {}", stats.known_projects);
    println!("Loaded projects:  {}", stats.loaded_projects);
    println!(
        "String pool:      {} entries ({} hits, {} misses)",
        stats.string_pool.entries, stats.string_pool.hits, stats.string_pool.misses
    );

    if let Some(name) = project {
        let memory = registry.get_project(name)?.memory_stats();
        println!();
        println!("Project:          {}", name.trim());
        println!("Targets:          {}", memory.target_count);
        println!("Tags:             {}", memory.tag_count);
        println!("Listing cached:   {}", memory.has_listing_cache);
        println!("Stats cached:     {}", memory.has_stats_cache);
        match memory.store {
            Some(store) => println!(
                "Store:            {} records, {} target buckets, {} duplicate ids",
                store.record_count, store.bucket_count, store.duplicate_ids
            ),
            None => println!("Store:            not created"),
        }
    }

    Ok(())
}
