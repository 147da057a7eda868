//! Per-unit analysis run.
//!
//! One call per analysis unit: detect changed class files, extract their
//! references against the shared artifact index, merge into the persisted
//! record, classify, and write report plus snapshot. The unit's record is
//! owned exclusively for the duration of the run. A run either completes
//! deterministically, skips (a value, not an error), or fails fatally
//! without writing a partial report.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::UnitSpec;
use crate::extract;
use crate::graph;
use crate::incremental;
use crate::index::ArtifactClassIndex;
use crate::model::{ChangeKind, LibraryId};
use crate::record::ClassDependencyRecord;
use crate::report;
use crate::classify;

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum UnitOutcome {
    #[serde(rename = "skipped")]
    Skipped { unit: String, reason: String },
    #[serde(rename = "checked")]
    Checked {
        unit: String,
        incremental: bool,
        changed_classes: usize,
        known_classes: usize,
        violations: usize,
        report_file: String,
    },
}

pub fn run_unit(
    unit: &UnitSpec,
    index: &ArtifactClassIndex,
    ignored: &BTreeSet<LibraryId>,
    full: bool,
) -> Result<UnitOutcome> {
    if unit.graph.is_empty() {
        return Ok(skipped(unit, "no resolved dependency graph"));
    }

    let snapshot_file = incremental::snapshot_path(&unit.report_file);
    // Incremental state is only trusted when the report it was written with
    // still exists; otherwise unchanged classes would lose their entries.
    let previous = if full || !unit.report_file.exists() {
        None
    } else {
        incremental::load_snapshot(&snapshot_file)?
    };
    let is_incremental = previous.is_some();

    let (changes, snapshot) = incremental::detect_changes(&unit.classes_dir, previous.as_ref())?;
    if changes.is_empty() {
        if is_incremental {
            return Ok(skipped(unit, "no changed class files"));
        }
        return Ok(skipped(unit, "no class files found"));
    }

    let mut record = if is_incremental {
        report::load_record(&unit.report_file)?
    } else {
        ClassDependencyRecord::new()
    };

    let artifacts = graph::collect_artifacts(&unit.graph);
    let classes_to_artifacts = index
        .classes_provided_by(&artifacts)
        .with_context(|| format!("Failed to index artifacts for unit '{}'", unit.name))?;

    let extracted: Vec<(String, ChangeKind, BTreeSet<LibraryId>)> = changes
        .par_iter()
        .map(|change| {
            let libraries = match change.kind {
                ChangeKind::Removed => BTreeSet::new(),
                ChangeKind::Added | ChangeKind::Modified => {
                    let bytes = std::fs::read(&change.path).with_context(|| {
                        format!("Failed to read class file: {}", change.path.display())
                    })?;
                    extract::referenced_libraries(&bytes, &classes_to_artifacts).with_context(
                        || format!("Failed to analyze class file: {}", change.path.display()),
                    )?
                }
            };
            Ok((change.class_name.clone(), change.kind, libraries))
        })
        .collect::<Result<_>>()?;

    for (class_name, kind, libraries) in extracted {
        record.apply_change(&class_name, kind, libraries);
    }

    let declared = graph::declared_dependencies(&unit.declared, &unit.graph);
    let used = record.used_libraries();
    let first_level = graph::first_level_ids(&unit.graph);
    let violations = classify::classify(&declared, &used, &first_level, ignored);

    report::write(&unit.report_file, &unit.name, &record, &violations)?;
    incremental::save_snapshot(&snapshot_file, &snapshot)?;

    Ok(UnitOutcome::Checked {
        unit: unit.name.clone(),
        incremental: is_incremental,
        changed_classes: changes.len(),
        known_classes: record.len(),
        violations: violations.len(),
        report_file: unit.report_file.to_string_lossy().to_string(),
    })
}

fn skipped(unit: &UnitSpec, reason: &str) -> UnitOutcome {
    UnitOutcome::Skipped {
        unit: unit.name.clone(),
        reason: reason.to_string(),
    }
}
