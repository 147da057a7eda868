use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use stale_deps::aggregate;
use stale_deps::check::{UnitOutcome, run_unit};
use stale_deps::cli::{Cli, Commands};
use stale_deps::config::{self, UnitSpec};
use stale_deps::incremental::snapshot_path;
use stale_deps::index::ArtifactClassIndex;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { graph, unit, full } => run_check(&graph, &unit, full),
        Commands::Report { paths } => run_report(&paths),
        Commands::Clear { graph } => run_clear(&graph),
    }
}

fn run_check(graph_path: &Path, unit_filter: &[String], full: bool) -> Result<()> {
    let graph_file = config::load_graph_file(graph_path)?;
    let ignored = config::ignored_ids(&graph_file);
    let units = select_units(&graph_file.units, unit_filter)?;

    // Units are independent; the artifact index is the only shared state and
    // dedupes archive scans across them.
    let index = ArtifactClassIndex::new();
    let outcomes: Vec<UnitOutcome> = units
        .par_iter()
        .map(|unit| {
            run_unit(unit, &index, &ignored, full)
                .with_context(|| format!("Check failed for unit '{}'", unit.name))
        })
        .collect::<Result<_>>()?;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

fn select_units<'a>(units: &'a [UnitSpec], filter: &[String]) -> Result<Vec<&'a UnitSpec>> {
    if filter.is_empty() {
        return Ok(units.iter().collect());
    }
    for name in filter {
        if !units.iter().any(|unit| unit.name == *name) {
            anyhow::bail!("Unknown unit '{name}' (not present in the graph file)");
        }
    }
    Ok(units
        .iter()
        .filter(|unit| filter.iter().any(|name| unit.name == *name))
        .collect())
}

fn run_report(paths: &[PathBuf]) -> Result<()> {
    let files = aggregate::expand_report_paths(paths)?;
    let violations = aggregate::aggregate(&files)?;
    if let Some(message) = aggregate::failure_message(&violations) {
        anyhow::bail!("Stale dependencies were found:\n{message}");
    }
    println!("No stale dependencies found ({} report(s))", files.len());
    Ok(())
}

fn run_clear(graph_path: &Path) -> Result<()> {
    let graph_file = config::load_graph_file(graph_path)?;
    for unit in &graph_file.units {
        remove_file_if_exists(&unit.report_file, "report")?;
        remove_file_if_exists(&snapshot_path(&unit.report_file), "snapshot")?;
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}
