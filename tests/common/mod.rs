//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clocktree_validator::{ClockTreeValidator, CompiledSchema};

pub const VALID: &str = "valid_clock_tree.json";
pub const MISSING_TRANSITIONS: &str = "missing_transitions.json";
pub const BAD_MULTIPLEXOR: &str = "bad_multiplexor.json";
pub const SCHEMA_ERRORS: &str = "schema_errors.json";
pub const MALFORMED: &str = "malformed.json";

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// Copy fixtures into `dir`, keeping their names
pub fn copy_fixtures(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let target = dir.join(name);
            std::fs::copy(fixture_path(name), &target).unwrap();
            target
        })
        .collect()
}

pub fn validator() -> ClockTreeValidator {
    ClockTreeValidator::new(Arc::new(CompiledSchema::embedded().unwrap()))
}
