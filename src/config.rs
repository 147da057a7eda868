//! Loading of the resolved-graph description file.
//!
//! The build system hands the core its view of the world through one JSON
//! file: the analysis units with their compiled-classes directory, report
//! location, declared dependencies and resolved graph. Relative paths are
//! taken relative to the description file itself.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::graph::{DeclaredSpec, ResolvedNode};
use crate::model::LibraryId;

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub ignored: Vec<LibraryId>,
}

#[derive(Debug, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub classes_dir: PathBuf,
    pub report_file: PathBuf,
    #[serde(default)]
    pub declared: Vec<DeclaredSpec>,
    #[serde(default)]
    pub graph: Vec<ResolvedNode>,
}

pub fn load_graph_file(path: &Path) -> Result<GraphFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file: {}", path.display()))?;
    let mut graph_file: GraphFile = serde_json::from_str(&content)
        .with_context(|| format!("Malformed graph file: {}", path.display()))?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        for unit in &mut graph_file.units {
            unit.classes_dir = resolve_path(base, &unit.classes_dir);
            unit.report_file = resolve_path(base, &unit.report_file);
            for node in &mut unit.graph {
                resolve_artifacts(base, node);
            }
        }
    }
    Ok(graph_file)
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn resolve_artifacts(base: &Path, node: &mut ResolvedNode) {
    if let Some(artifact) = node.artifact.take() {
        node.artifact = Some(resolve_path(base, &artifact));
    }
    for child in &mut node.children {
        resolve_artifacts(base, child);
    }
}

/// Dependencies the Kotlin toolchain injects into every compile classpath.
/// They are expected on the classpath without direct bytecode references
/// and are never stale-dependency candidates.
pub fn default_ignored() -> BTreeSet<LibraryId> {
    [
        LibraryId::new("org.jetbrains.kotlin", "kotlin-stdlib-jdk8"),
        LibraryId::new("org.jetbrains.kotlin", "kotlin-reflect"),
    ]
    .into_iter()
    .collect()
}

pub fn ignored_ids(graph_file: &GraphFile) -> BTreeSet<LibraryId> {
    let mut ignored = default_ignored();
    ignored.extend(graph_file.ignored.iter().cloned());
    ignored
}
