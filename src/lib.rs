//! # stale-deps
//!
//! Detects stale build dependencies for JVM compiled output: declared
//! libraries that no compiled class references, or that are only needed
//! through another declared dependency's transitive closure.
//!
//! ## Architecture
//!
//! - **model**: library identities, declared dependencies, file changes, violations
//! - **graph**: resolved dependency graph input and transitive closures
//! - **index**: shared memoized artifact-to-classes index
//! - **classfile**: structural parser for compiled class files
//! - **extract**: type-reference extraction over the class-file model
//! - **record**: per-unit class-dependency record with incremental merge
//! - **report**: XML report codec for records and violations
//! - **classify**: stale-dependency classification
//! - **aggregate**: cross-unit violation aggregation and failure rendering
//! - **incremental**: class-file change detection snapshots
//! - **check**: per-unit analysis runner
//! - **config**: resolved-graph description file loading
//! - **cli**: command-line interface

pub mod aggregate;
pub mod check;
pub mod classfile;
pub mod classify;
pub mod cli;
pub mod config;
pub mod extract;
pub mod graph;
pub mod incremental;
pub mod index;
pub mod model;
pub mod record;
pub mod report;
