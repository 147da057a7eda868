//! Cross-unit aggregation of persisted violations.

use anyhow::Result;
use std::path::PathBuf;

use crate::model::Violation;
use crate::report;

/// Concatenates the violations stored in the given report files. Files that
/// do not exist contribute nothing: a skipped unit simply has no report.
pub fn aggregate(paths: &[PathBuf]) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();
    for path in paths {
        violations.extend(report::load_violations(path)?);
    }
    Ok(violations)
}

/// Expands a mix of report files and directories into the report files to
/// aggregate; directories contribute their `.xml` entries, sorted.
pub fn expand_report_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// One human-readable block per violation, joined by newlines; `None` when
/// there is nothing to report.
pub fn failure_message(violations: &[Violation]) -> Option<String> {
    if violations.is_empty() {
        return None;
    }
    Some(
        violations
            .iter()
            .map(Violation::describe)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclaredDependency, LibraryId};
    use crate::record::ClassDependencyRecord;
    use std::collections::BTreeSet;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stale_deps_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn unused(module: &str) -> Violation {
        Violation::Unused(DeclaredDependency {
            id: LibraryId::new("g", module),
            configuration: "implementation".to_string(),
            transitives: BTreeSet::new(),
        })
    }

    #[test]
    fn aggregates_across_files_and_skips_missing_ones() -> Result<()> {
        let dir = temp_dir("aggregate");
        std::fs::create_dir_all(&dir)?;
        let main_report = dir.join("main.xml");
        let test_report = dir.join("test.xml");
        let missing = dir.join("missing.xml");

        let record = ClassDependencyRecord::new();
        report::write(&main_report, "main", &record, &[unused("a")])?;
        report::write(&test_report, "test", &record, &[unused("b")])?;

        let violations = aggregate(&[main_report, missing, test_report])?;
        assert_eq!(violations, vec![unused("a"), unused("b")]);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn directories_expand_to_their_xml_reports() -> Result<()> {
        let dir = temp_dir("expand");
        std::fs::create_dir_all(&dir)?;
        let record = ClassDependencyRecord::new();
        report::write(&dir.join("b.xml"), "b", &record, &[])?;
        report::write(&dir.join("a.xml"), "a", &record, &[])?;
        std::fs::write(dir.join("notes.txt"), "not a report")?;

        let files = expand_report_paths(std::slice::from_ref(&dir))?;
        assert_eq!(files, vec![dir.join("a.xml"), dir.join("b.xml")]);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn failure_message_joins_violation_blocks() {
        assert!(failure_message(&[]).is_none());

        let message = failure_message(&[unused("a"), unused("b")]).unwrap();
        assert!(message.contains("dependency=g:a"));
        assert!(message.contains("dependency=g:b"));
        assert_eq!(message.lines().count(), 4);
    }
}
