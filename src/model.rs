use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Structural (group, module) identity of a library. Versions are resolved
/// upstream and never part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LibraryId {
    pub group: String,
    pub module: String,
}

impl LibraryId {
    pub fn new(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            module: module.into(),
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.module)
    }
}

/// One resolved artifact of the dependency graph. The backing file is only
/// present for archive artifacts; anything else provides no classes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedArtifact {
    pub id: LibraryId,
    pub file: Option<PathBuf>,
}

/// A dependency declared in build configuration for one scope, together with
/// the LibraryIds reachable below it in the resolved graph (excluding its
/// own id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeclaredDependency {
    pub id: LibraryId,
    pub configuration: String,
    pub transitives: BTreeSet<LibraryId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One changed compiled class file since the previous run.
#[derive(Debug, Clone)]
pub struct ClassChange {
    pub class_name: String,
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// A stale-dependency finding for one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Never referenced by any compiled class.
    Unused(DeclaredDependency),
    /// Not referenced directly, but some of its transitive dependencies are
    /// (and those are not first-level dependencies themselves).
    TransitiveUsage {
        dependency: DeclaredDependency,
        used_transitives: BTreeSet<LibraryId>,
    },
}

impl Violation {
    pub fn describe(&self) -> String {
        match self {
            Violation::Unused(dependency) => format!(
                "Dependency is unused at compile time and can be removed safely (configuration '{}'):\n    dependency={}",
                dependency.configuration, dependency.id
            ),
            Violation::TransitiveUsage {
                dependency,
                used_transitives,
            } => {
                let mut out = format!(
                    "Dependency is used only through its transitive dependencies (configuration '{}'):\n    dependency={}",
                    dependency.configuration, dependency.id
                );
                for transitive in used_transitives {
                    out.push_str(&format!(
                        "\n        used transitive dependency={transitive}"
                    ));
                }
                out
            }
        }
    }
}
