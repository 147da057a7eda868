//! File-delta detection over a unit's compiled-classes directory.
//!
//! A snapshot of content digests is persisted next to the report file; the
//! next run diffs the directory against it to produce Added/Modified/Removed
//! changes. Without a usable snapshot the caller falls back to a full
//! rebuild.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::model::{ChangeKind, ClassChange};

const CLASS_SUFFIX: &str = ".class";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFileSnapshot {
    /// Class FQN (dot form) to its last observed state.
    pub files: BTreeMap<String, ClassFileState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFileState {
    /// Path relative to the classes directory.
    pub path: String,
    pub digest: String,
}

/// The snapshot lives next to the report file as `<stem>.state.json`.
pub fn snapshot_path(report_file: &Path) -> PathBuf {
    let stem = report_file
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("report");
    let file_name = format!("{stem}.state.json");
    match report_file.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

pub fn load_snapshot(path: &Path) -> Result<Option<ClassFileSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Malformed snapshot file: {}", path.display()))?;
    Ok(Some(snapshot))
}

pub fn save_snapshot(path: &Path, snapshot: &ClassFileSnapshot) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write snapshot file: {}", path.display()))
}

pub fn scan_class_files(classes_dir: &Path) -> Result<Vec<PathBuf>> {
    if !classes_dir.exists() {
        return Ok(Vec::new());
    }
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(classes_dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(CLASS_SUFFIX))
                {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut files: Vec<PathBuf> = rx.iter().collect();
    files.sort();
    Ok(files)
}

/// Diffs the directory against `previous` (None marks everything Added)
/// and returns the changes plus the snapshot describing the current state.
pub fn detect_changes(
    classes_dir: &Path,
    previous: Option<&ClassFileSnapshot>,
) -> Result<(Vec<ClassChange>, ClassFileSnapshot)> {
    let files = scan_class_files(classes_dir)?;

    let states: Vec<(String, ClassFileState, PathBuf)> = files
        .par_iter()
        .map(|path| {
            let relative = path
                .strip_prefix(classes_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read class file: {}", path.display()))?;
            Ok((
                class_name_from_relative_path(&relative),
                ClassFileState {
                    path: relative,
                    digest: digest_bytes(&bytes),
                },
                path.clone(),
            ))
        })
        .collect::<Result<_>>()?;

    let mut snapshot = ClassFileSnapshot::default();
    let mut changes = Vec::new();
    for (class_name, state, path) in states {
        let kind = match previous.and_then(|p| p.files.get(&class_name)) {
            None => Some(ChangeKind::Added),
            Some(old) if old.digest != state.digest => Some(ChangeKind::Modified),
            Some(_) => None,
        };
        if let Some(kind) = kind {
            changes.push(ClassChange {
                class_name: class_name.clone(),
                kind,
                path,
            });
        }
        snapshot.files.insert(class_name, state);
    }

    if let Some(previous) = previous {
        for (class_name, state) in &previous.files {
            if !snapshot.files.contains_key(class_name) {
                changes.push(ClassChange {
                    class_name: class_name.clone(),
                    kind: ChangeKind::Removed,
                    path: classes_dir.join(&state.path),
                });
            }
        }
    }

    Ok((changes, snapshot))
}

pub fn class_name_from_relative_path(relative: &str) -> String {
    relative
        .trim_end_matches(CLASS_SUFFIX)
        .replace(['/', '\\'], ".")
}

fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
