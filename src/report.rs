//! Durable report codec for one analysis unit.
//!
//! One XML file per unit carries both the class-dependency record (reloaded
//! as the starting state of the next incremental run) and the violations of
//! the last run (read back by the aggregator). Attribute names and nesting
//! are a compatibility surface; child order is not, and readers accept
//! self-closing as well as expanded elements.

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::model::{DeclaredDependency, LibraryId, Violation};
use crate::record::ClassDependencyRecord;

const UNIT_TAG: &str = "AnalysisUnit";
const DEPENDENCIES_TAG: &str = "Dependencies";
const CLASS_TAG: &str = "Class";
const DEPENDENCY_TAG: &str = "Dependency";
const VIOLATIONS_TAG: &str = "Violations";
const UNUSED_TAG: &str = "UnusedDependency";
const TRANSITIVE_TAG: &str = "TransitiveUsageDependency";
const NAME_ATTR: &str = "name";
const CLASS_NAME_ATTR: &str = "className";
const GROUP_ID_ATTR: &str = "groupId";
const MODULE_ID_ATTR: &str = "moduleId";
const CONFIGURATION_ATTR: &str = "configurationName";

pub fn write(
    path: &Path,
    unit_name: &str,
    record: &ClassDependencyRecord,
    violations: &[Violation],
) -> Result<()> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut unit = BytesStart::new(UNIT_TAG);
    unit.push_attribute((NAME_ATTR, unit_name));
    writer.write_event(Event::Start(unit))?;

    writer.write_event(Event::Start(BytesStart::new(DEPENDENCIES_TAG)))?;
    for (class_name, libraries) in record.entries() {
        let mut class = BytesStart::new(CLASS_TAG);
        class.push_attribute((CLASS_NAME_ATTR, class_name.as_str()));
        if libraries.is_empty() {
            writer.write_event(Event::Empty(class))?;
            continue;
        }
        writer.write_event(Event::Start(class))?;
        for library in libraries {
            writer.write_event(Event::Empty(dependency_element(library)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(CLASS_TAG)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(DEPENDENCIES_TAG)))?;

    writer.write_event(Event::Start(BytesStart::new(VIOLATIONS_TAG)))?;
    for violation in violations {
        match violation {
            Violation::Unused(dependency) => {
                writer.write_event(Event::Empty(violation_element(UNUSED_TAG, dependency)))?;
            }
            Violation::TransitiveUsage {
                dependency,
                used_transitives,
            } => {
                writer.write_event(Event::Start(violation_element(TRANSITIVE_TAG, dependency)))?;
                for transitive in used_transitives {
                    writer.write_event(Event::Empty(dependency_element(transitive)))?;
                }
                writer.write_event(Event::End(BytesEnd::new(TRANSITIVE_TAG)))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(VIOLATIONS_TAG)))?;

    writer.write_event(Event::End(BytesEnd::new(UNIT_TAG)))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }
    std::fs::write(path, writer.into_inner())
        .with_context(|| format!("Failed to write report file: {}", path.display()))
}

fn dependency_element(library: &LibraryId) -> BytesStart<'static> {
    let mut element = BytesStart::new(DEPENDENCY_TAG);
    element.push_attribute((GROUP_ID_ATTR, library.group.as_str()));
    element.push_attribute((MODULE_ID_ATTR, library.module.as_str()));
    element
}

fn violation_element(tag: &'static str, dependency: &DeclaredDependency) -> BytesStart<'static> {
    let mut element = BytesStart::new(tag);
    element.push_attribute((CONFIGURATION_ATTR, dependency.configuration.as_str()));
    element.push_attribute((GROUP_ID_ATTR, dependency.id.group.as_str()));
    element.push_attribute((MODULE_ID_ATTR, dependency.id.module.as_str()));
    element
}

/// Loads the class-dependency record of a previous run; empty when the
/// report does not exist yet.
pub fn load_record(path: &Path) -> Result<ClassDependencyRecord> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(ClassDependencyRecord::new());
    };
    parse_record(&content).with_context(|| format!("Malformed report file: {}", path.display()))
}

/// Loads the persisted violations; empty when the report does not exist.
pub fn load_violations(path: &Path) -> Result<Vec<Violation>> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(Vec::new());
    };
    parse_violations(&content)
        .with_context(|| format!("Malformed report file: {}", path.display()))
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read report file: {}", path.display()))
}

fn parse_record(content: &str) -> Result<ClassDependencyRecord> {
    let mut reader = Reader::from_str(content);
    let mut classes: BTreeMap<String, BTreeSet<LibraryId>> = BTreeMap::new();
    let mut current: Option<(String, BTreeSet<LibraryId>)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) if element.name().as_ref() == CLASS_TAG.as_bytes() => {
                current = Some((required_attr(&element, CLASS_NAME_ATTR)?, BTreeSet::new()));
            }
            Event::Empty(element) if element.name().as_ref() == CLASS_TAG.as_bytes() => {
                classes.insert(required_attr(&element, CLASS_NAME_ATTR)?, BTreeSet::new());
            }
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == DEPENDENCY_TAG.as_bytes() =>
            {
                if let Some((_, libraries)) = current.as_mut() {
                    libraries.insert(library_attr(&element)?);
                }
            }
            Event::End(element) if element.name().as_ref() == CLASS_TAG.as_bytes() => {
                if let Some((class_name, libraries)) = current.take() {
                    classes.insert(class_name, libraries);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ClassDependencyRecord::from_entries(classes))
}

fn parse_violations(content: &str) -> Result<Vec<Violation>> {
    let mut reader = Reader::from_str(content);
    let mut violations = Vec::new();
    let mut pending: Option<(DeclaredDependency, BTreeSet<LibraryId>)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == UNUSED_TAG.as_bytes() =>
            {
                violations.push(Violation::Unused(declared_attr(&element)?));
            }
            Event::Start(element) if element.name().as_ref() == TRANSITIVE_TAG.as_bytes() => {
                pending = Some((declared_attr(&element)?, BTreeSet::new()));
            }
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == DEPENDENCY_TAG.as_bytes() =>
            {
                if let Some((_, used_transitives)) = pending.as_mut() {
                    used_transitives.insert(library_attr(&element)?);
                }
            }
            Event::End(element) if element.name().as_ref() == TRANSITIVE_TAG.as_bytes() => {
                if let Some((dependency, used_transitives)) = pending.take() {
                    violations.push(Violation::TransitiveUsage {
                        dependency,
                        used_transitives,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(violations)
}

fn library_attr(element: &BytesStart<'_>) -> Result<LibraryId> {
    Ok(LibraryId::new(
        required_attr(element, GROUP_ID_ATTR)?,
        required_attr(element, MODULE_ID_ATTR)?,
    ))
}

fn declared_attr(element: &BytesStart<'_>) -> Result<DeclaredDependency> {
    Ok(DeclaredDependency {
        id: library_attr(element)?,
        configuration: required_attr(element, CONFIGURATION_ATTR)?,
        // Closures are not persisted; readers only need identity and scope.
        transitives: BTreeSet::new(),
    })
}

fn required_attr(element: &BytesStart<'_>, name: &str) -> Result<String> {
    let Some(attribute) = element.try_get_attribute(name)? else {
        bail!(
            "Missing attribute '{name}' on element '{}'",
            String::from_utf8_lossy(element.name().as_ref())
        );
    };
    Ok(attribute.unescape_value()?.into_owned())
}
