//! Stale-dependency classification.
//!
//! Pure given well-formed inputs: no IO, no errors. The used-set must be the
//! union over the whole merged record (see `record`), never the current
//! delta alone.

use std::collections::BTreeSet;

use crate::model::{DeclaredDependency, LibraryId, Violation};

/// Classifies each declared dependency against observed usage.
///
/// A dependency referenced directly never violates, whatever its closure
/// looks like. An unused one is reported as `Unused`, or as
/// `TransitiveUsage` when part of its transitive closure is referenced,
/// unless those transitives are first-level resolved dependencies in their
/// own right and accounted for elsewhere. Ignored ids
/// (toolchain-injected dependencies with no expected bytecode surface) are
/// exempt. Output is ordered by LibraryId so results are stable for a fixed
/// input.
pub fn classify(
    declared: &BTreeSet<DeclaredDependency>,
    used: &BTreeSet<LibraryId>,
    first_level: &BTreeSet<LibraryId>,
    ignored: &BTreeSet<LibraryId>,
) -> Vec<Violation> {
    let mut violations: Vec<Violation> = declared
        .iter()
        .filter(|dependency| !used.contains(&dependency.id) && !ignored.contains(&dependency.id))
        .map(|dependency| {
            let used_transitives: BTreeSet<LibraryId> = dependency
                .transitives
                .iter()
                .filter(|transitive| {
                    used.contains(*transitive) && !first_level.contains(*transitive)
                })
                .cloned()
                .collect();
            if used_transitives.is_empty() {
                Violation::Unused(dependency.clone())
            } else {
                Violation::TransitiveUsage {
                    dependency: dependency.clone(),
                    used_transitives,
                }
            }
        })
        .collect();

    violations.sort_by(|a, b| violation_id(a).cmp(violation_id(b)));
    violations
}

fn violation_id(violation: &Violation) -> &LibraryId {
    match violation {
        Violation::Unused(dependency) => &dependency.id,
        Violation::TransitiveUsage { dependency, .. } => &dependency.id,
    }
}
