//! Shared, memoized index of the classes each resolved artifact provides.
//!
//! Enumerating a jar's entry table is the expensive part of a run and the
//! same artifact shows up in many analysis units, so scan results are cached
//! for the process lifetime, keyed by artifact identity. The index is the
//! only state shared between units and is safe for concurrent access: each
//! artifact is scanned exactly once, other threads block on the same cell.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use zip::ZipArchive;

use crate::model::{LibraryId, ResolvedArtifact};

const CLASS_SUFFIX: &str = ".class";

type ArtifactKey = (LibraryId, Option<PathBuf>);

#[derive(Debug, Clone)]
enum ScanOutcome {
    Classes(Arc<BTreeSet<String>>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ArtifactClassIndex {
    entries: Mutex<HashMap<ArtifactKey, Arc<OnceLock<ScanOutcome>>>>,
}

impl ArtifactClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inverts the given artifact set into a mapping from binary class name
    /// (slash-separated, no `.class` suffix) to the ids of every artifact
    /// providing it. A failed scan is fatal for the caller and stays cached:
    /// an incomplete index would silently under-report usage.
    pub fn classes_provided_by(
        &self,
        artifacts: &[ResolvedArtifact],
    ) -> Result<HashMap<String, BTreeSet<LibraryId>>> {
        let cells: Vec<(ResolvedArtifact, Arc<OnceLock<ScanOutcome>>)> = {
            let mut entries = self.entries.lock().expect("artifact index lock poisoned");
            artifacts
                .iter()
                .map(|artifact| {
                    let key = (artifact.id.clone(), artifact.file.clone());
                    (artifact.clone(), entries.entry(key).or_default().clone())
                })
                .collect()
        };

        let scanned: Vec<(LibraryId, ScanOutcome)> = cells
            .into_par_iter()
            .map(|(artifact, cell)| {
                let outcome = cell.get_or_init(|| scan_artifact(&artifact)).clone();
                (artifact.id, outcome)
            })
            .collect();

        let mut result: HashMap<String, BTreeSet<LibraryId>> = HashMap::new();
        for (id, outcome) in scanned {
            let classes = match outcome {
                ScanOutcome::Classes(classes) => classes,
                ScanOutcome::Failed(message) => bail!("{message}"),
            };
            for class in classes.iter() {
                result.entry(class.clone()).or_default().insert(id.clone());
            }
        }
        Ok(result)
    }
}

fn scan_artifact(artifact: &ResolvedArtifact) -> ScanOutcome {
    let Some(file) = artifact.file.as_deref() else {
        return ScanOutcome::Classes(Arc::new(BTreeSet::new()));
    };
    if file.extension().is_none_or(|ext| ext != "jar") {
        return ScanOutcome::Classes(Arc::new(BTreeSet::new()));
    }
    match read_classes_from_archive(file) {
        Ok(classes) => ScanOutcome::Classes(Arc::new(classes)),
        Err(e) => ScanOutcome::Failed(format!("{e:#}")),
    }
}

fn read_classes_from_archive(path: &Path) -> Result<BTreeSet<String>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open jar: {}", path.display()))?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime
    // of the mmap. The mmap is dropped before the file.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip structure: {}", path.display()))?;

    let mut classes = BTreeSet::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry in {}", path.display()))?;
        let name = entry.name();
        if let Some(class) = name.strip_suffix(CLASS_SUFFIX) {
            classes.insert(class.replace('\\', "/"));
        }
    }
    Ok(classes)
}
