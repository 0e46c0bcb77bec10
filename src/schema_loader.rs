//! Schema loading and compilation
//!
//! The clock tree schema is compiled exactly once, at startup, into a
//! [`CompiledSchema`]. The compiled value is immutable and `Send + Sync`, so
//! it is shared behind an `Arc` by every validation that follows.

use std::path::{Path, PathBuf};

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClockTreeError, Result};
use crate::formatter::{RawViolation, SchemaViolationKind};

/// The clock tree schema shipped with the validator.
pub const DEFAULT_SCHEMA: &str = include_str!("../schemas/clocktree.schema.json");

/// Where the compiled schema came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Embedded,
    File(PathBuf),
    Inline,
}

impl std::fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaSource::Embedded => write!(f, "embedded clock tree schema"),
            SchemaSource::File(path) => write!(f, "{}", path.display()),
            SchemaSource::Inline => write!(f, "inline schema"),
        }
    }
}

/// A schema compiled with format checking enabled and all-errors reporting.
pub struct CompiledSchema {
    validator: Validator,
    source: SchemaSource,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile an already parsed schema document.
    pub fn compile(schema: &Value) -> Result<Self> {
        Self::compile_with_source(schema, SchemaSource::Inline)
    }

    /// Compile the embedded default schema.
    pub fn embedded() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(DEFAULT_SCHEMA).map_err(|e| ClockTreeError::SchemaCompile {
                details: format!("embedded schema is not valid JSON: {}", e),
            })?;
        Self::compile_with_source(&schema, SchemaSource::Embedded)
    }

    fn compile_with_source(schema: &Value, source: SchemaSource) -> Result<Self> {
        let mut options = jsonschema::options();
        options.should_validate_formats(true);
        let validator = options
            .build(schema)
            .map_err(|e| ClockTreeError::SchemaCompile {
                details: e.to_string(),
            })?;

        debug!(source = %source, "compiled clock tree schema");
        Ok(Self { validator, source })
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// Quick check without collecting violations.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Every violation of `instance`, in the order the engine reports them.
    pub fn violations(&self, instance: &Value) -> Vec<RawViolation> {
        self.validator
            .iter_errors(instance)
            .flat_map(raw_violations)
            .collect()
    }
}

/// Convert one engine error into our closed violation set.
///
/// An `additionalProperties` failure names every unexpected member at once;
/// it is split so each member gets its own message.
fn raw_violations(error: ValidationError<'_>) -> Vec<RawViolation> {
    let instance_path = error.instance_path.to_string();
    let message = error.to_string();
    let data = error.instance.clone().into_owned();

    let kind = match &error.kind {
        ValidationErrorKind::Enum { .. } => SchemaViolationKind::Enum,
        ValidationErrorKind::Required { property } => SchemaViolationKind::Required {
            missing_property: property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string()),
        },
        ValidationErrorKind::Type { .. } => SchemaViolationKind::Type,
        ValidationErrorKind::Constant { expected_value } => SchemaViolationKind::Const {
            allowed_value: expected_value.clone(),
        },
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            return unexpected
                .iter()
                .map(|property| RawViolation {
                    kind: SchemaViolationKind::AdditionalProperties {
                        additional_property: property.clone(),
                    },
                    instance_path: instance_path.clone(),
                    data: data.clone(),
                    message: message.clone(),
                })
                .collect();
        }
        ValidationErrorKind::Format { format } => SchemaViolationKind::Format {
            format: format.clone(),
        },
        _ => SchemaViolationKind::Other,
    };

    vec![RawViolation {
        kind,
        instance_path,
        data,
        message,
    }]
}

/// Loads the schema used for a run: the embedded one, or an override file.
pub struct SchemaLoader;

impl SchemaLoader {
    /// Load and compile the schema. Any failure here aborts startup.
    pub async fn load(path: Option<&Path>) -> Result<CompiledSchema> {
        let Some(path) = path else {
            return CompiledSchema::embedded();
        };

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ClockTreeError::SchemaRead {
                    path: path.to_path_buf(),
                    details: e.to_string(),
                })?;
        let schema: Value =
            serde_json::from_str(&content).map_err(|e| ClockTreeError::SchemaRead {
                path: path.to_path_buf(),
                details: format!("invalid JSON: {}", e),
            })?;

        CompiledSchema::compile_with_source(&schema, SchemaSource::File(path.to_path_buf()))
    }
}
