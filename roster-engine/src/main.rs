//! roster - batch contact consolidation
//!
//! Loads contact exports and optional override lists, runs the
//! consolidation pipeline, and writes `tiers.json`, `audit.json` and
//! `summary.json` to the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use roster_common::config::write_toml_config;
use roster_common::logging::init_tracing;
use roster_engine::config::resolve_config;
use roster_engine::loaders::{
    read_contact_refs, read_contact_removals, read_organization_list, read_table,
};
use roster_engine::models::OverrideLists;
use roster_engine::{Pipeline, PipelineInput, RosterConfig};
use serde::Serialize;
use tracing::{info, warn};

/// Command-line arguments for roster
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Consolidate contact exports into capacity-limited priority tiers")]
#[command(version)]
struct Args {
    /// Contact source files (.json or .jsonl), in priority order
    #[arg(short, long = "input", num_args = 1.., required_unless_present = "init_config")]
    inputs: Vec<PathBuf>,

    /// TOML config file (falls back to ROSTER_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Organization exclude list
    #[arg(long)]
    org_exclude: Option<PathBuf>,

    /// Organization include list (allow-list)
    #[arg(long)]
    org_include: Option<PathBuf>,

    /// Contact removal list (email exact match, else fuzzy name/organization)
    #[arg(long)]
    contact_remove: Option<PathBuf>,

    /// Contact exclude list (exact name/organization)
    #[arg(long)]
    contact_exclude: Option<PathBuf>,

    /// Contact inclusion list (forced into output)
    #[arg(long)]
    contact_include: Option<PathBuf>,

    /// Output directory (overrides `output_dir` from the config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write the built-in default config to this path and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.init_config {
        write_toml_config(&RosterConfig::default(), path)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = resolve_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.common.logging).context("Failed to initialize logging")?;

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.common.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut tables = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        match read_table(path) {
            Ok(table) => tables.push(table),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable source"),
        }
    }
    if tables.is_empty() {
        bail!("No readable input sources");
    }

    let overrides = load_overrides(&args)?;
    if overrides.is_empty() {
        info!("No override lists supplied");
    } else {
        info!(
            organization_exclude = overrides.organization_exclude.len(),
            organization_include = overrides.organization_include.len(),
            contact_remove = overrides.contact_remove.len(),
            contact_exclude = overrides.contact_exclude.len(),
            contact_include = overrides.contact_include.len(),
            "Loaded override lists"
        );
    }
    let pipeline = Pipeline::new(config.engine).context("Invalid engine configuration")?;
    let result = pipeline
        .run(&PipelineInput::new(tables).with_overrides(overrides))
        .context("Consolidation run failed")?;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    write_json(&output_dir.join("tiers.json"), &result.tiers)?;
    write_json(&output_dir.join("audit.json"), &result.audit)?;
    write_json(&output_dir.join("summary.json"), &result.summary)?;

    info!(
        run_id = %result.run_id,
        output_dir = %output_dir.display(),
        "{}",
        result.summary.display_string()
    );
    for tier in &result.summary.tiers {
        info!("{}", tier.display_string());
    }

    Ok(())
}

fn load_overrides(args: &Args) -> Result<OverrideLists> {
    let mut lists = OverrideLists::default();

    if let Some(path) = &args.org_exclude {
        lists.organization_exclude = read_organization_list(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    if let Some(path) = &args.org_include {
        lists.organization_include = read_organization_list(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    if let Some(path) = &args.contact_remove {
        lists.contact_remove = read_contact_removals(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    if let Some(path) = &args.contact_exclude {
        lists.contact_exclude = read_contact_refs(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    if let Some(path) = &args.contact_include {
        lists.contact_include = read_contact_refs(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    Ok(lists)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
