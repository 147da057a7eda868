//! Per-unit record of which libraries each compiled class references.
//!
//! The record is the persisted accumulator behind incremental runs: classes
//! untouched since the last run keep their stored entries, so the classifier
//! always sees usage across the whole unit, not just the current delta.
//! Loaded from and saved to the unit's report file by `report`.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ChangeKind, LibraryId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDependencyRecord {
    classes: BTreeMap<String, BTreeSet<LibraryId>>,
}

impl ClassDependencyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(classes: BTreeMap<String, BTreeSet<LibraryId>>) -> Self {
        Self { classes }
    }

    /// Merges one file change. A removed class is deleted outright; its
    /// prior references must stop counting as usage. An added or modified
    /// class has its set replaced, never unioned: a class that stopped
    /// referencing a library must stop counting as usage of it.
    pub fn apply_change(
        &mut self,
        class_name: &str,
        kind: ChangeKind,
        libraries: BTreeSet<LibraryId>,
    ) {
        match kind {
            ChangeKind::Removed => {
                self.classes.remove(class_name);
            }
            ChangeKind::Added | ChangeKind::Modified => {
                self.classes.insert(class_name.to_string(), libraries);
            }
        }
    }

    /// Union of every class's references; the used-set the classifier
    /// consults.
    pub fn used_libraries(&self) -> BTreeSet<LibraryId> {
        self.classes.values().flatten().cloned().collect()
    }

    pub fn entries(&self) -> &BTreeMap<String, BTreeSet<LibraryId>> {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}
