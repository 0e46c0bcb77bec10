//! Clock tree validation
//!
//! [`ClockTreeValidator`] is the single entry point for checking one
//! document: parse with positions, run the compiled schema, run the graph
//! checks, and return every message together. It holds no mutable state, so
//! one instance can serve any number of concurrent callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::formatter::format_violation;
use crate::graph::check_graph;
use crate::schema_loader::CompiledSchema;
use crate::source_map::parse_with_positions;

/// Verdict for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Parse error alone, or schema messages followed by graph messages.
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClockTreeValidator {
    schema: Arc<CompiledSchema>,
}

impl ClockTreeValidator {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Validate raw document text.
    pub fn validate_str(&self, text: &str) -> ValidationOutcome {
        let parsed = match parse_with_positions(text) {
            Ok(parsed) => parsed,
            Err(e) => return ValidationOutcome::from_errors(vec![e.to_string()]),
        };

        let mut errors: Vec<String> = self
            .schema
            .violations(&parsed.data)
            .iter()
            .map(|violation| format_violation(violation, Some(&parsed.pointers)))
            .collect();
        let schema_errors = errors.len();

        errors.extend(check_graph(&parsed.data).errors);

        trace!(
            schema_errors,
            graph_errors = errors.len() - schema_errors,
            "validated clock tree document"
        );
        ValidationOutcome::from_errors(errors)
    }

    /// Validate raw bytes; invalid UTF-8 is reported like any other parse failure.
    pub fn validate_bytes(&self, bytes: &[u8]) -> ValidationOutcome {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.validate_str(text),
            Err(e) => ValidationOutcome::from_errors(vec![format!(
                "error reading or parsing the JSON file: {}",
                e
            )]),
        }
    }
}
