//! Resolved dependency graph as delivered by the build system.
//!
//! The graph file carries first-level nodes with their resolved children as
//! a tree. Everything here is read-only input: artifact collection, declared
//! dependency derivation and transitive closures are computed per analysis
//! unit from this snapshot.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::model::{DeclaredDependency, LibraryId, ResolvedArtifact};

/// One node of the resolved graph. First-level nodes are the entries listed
/// directly in the unit's graph; children repeat the shape recursively.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedNode {
    pub group: String,
    pub module: String,
    #[serde(default)]
    pub artifact: Option<PathBuf>,
    #[serde(default)]
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    pub fn id(&self) -> LibraryId {
        LibraryId::new(self.group.clone(), self.module.clone())
    }
}

/// Declared dependency as written in the build configuration, before it is
/// matched against the resolved first-level nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct DeclaredSpec {
    pub group: String,
    pub module: String,
    pub configuration: String,
}

pub fn first_level_ids(graph: &[ResolvedNode]) -> BTreeSet<LibraryId> {
    graph.iter().map(ResolvedNode::id).collect()
}

/// Every artifact reachable in the graph, deduplicated. Transitive artifacts
/// are included: the class index must cover them so transitive usage is
/// observable.
pub fn collect_artifacts(graph: &[ResolvedNode]) -> Vec<ResolvedArtifact> {
    let mut artifacts = BTreeSet::new();
    let mut stack: Vec<&ResolvedNode> = graph.iter().collect();
    while let Some(node) = stack.pop() {
        artifacts.insert(ResolvedArtifact {
            id: node.id(),
            file: node.artifact.clone(),
        });
        stack.extend(node.children.iter());
    }
    artifacts.into_iter().collect()
}

/// Matches declared entries against the resolved first-level nodes and
/// attaches each one's transitive closure. Declared entries that did not
/// resolve to a first-level node are dropped, as are resolved nodes nobody
/// declared.
pub fn declared_dependencies(
    declared: &[DeclaredSpec],
    graph: &[ResolvedNode],
) -> BTreeSet<DeclaredDependency> {
    declared
        .iter()
        .filter_map(|spec| {
            let id = LibraryId::new(spec.group.clone(), spec.module.clone());
            let node = graph.iter().find(|node| node.id() == id)?;
            Some(DeclaredDependency {
                id,
                configuration: spec.configuration.clone(),
                transitives: transitive_closure(node),
            })
        })
        .collect()
}

/// The set of LibraryIds reachable below `node`, excluding its own id.
///
/// Each id is expanded at most once globally per call, and an id equal to
/// the root's never enters the set. Graphs with cycles terminate because a
/// revisited id is never expanded again.
pub fn transitive_closure(node: &ResolvedNode) -> BTreeSet<LibraryId> {
    let root_id = node.id();
    let mut closure = BTreeSet::new();
    let mut stack: Vec<&ResolvedNode> = node.children.iter().collect();
    while let Some(child) = stack.pop() {
        let child_id = child.id();
        if child_id == root_id {
            continue;
        }
        if closure.insert(child_id) {
            stack.extend(child.children.iter());
        }
    }
    closure
}
