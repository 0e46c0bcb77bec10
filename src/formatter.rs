//! Human-readable messages for schema violations

use serde_json::Value;

use crate::source_map::PointerMap;

/// Path shown when a violation concerns the document root.
pub const ROOT_PATH: &str = "root";

/// The schema keyword that a violation failed on.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaViolationKind {
    Enum,
    Required { missing_property: String },
    Type,
    Const { allowed_value: Value },
    AdditionalProperties { additional_property: String },
    Format { format: String },
    Other,
}

/// One schema violation as reported by the compiled schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RawViolation {
    pub kind: SchemaViolationKind,
    /// JSON Pointer of the offending instance, empty for the root.
    pub instance_path: String,
    /// The offending instance value.
    pub data: Value,
    /// Message produced by the schema engine.
    pub message: String,
}

/// Render a violation, appending its source position when the pointer map knows it.
pub fn format_violation(violation: &RawViolation, pointers: Option<&PointerMap>) -> String {
    let path = if violation.instance_path.is_empty() {
        ROOT_PATH
    } else {
        violation.instance_path.as_str()
    };
    // Looked up on the displayed path, so root violations carry no position.
    let position = position_suffix(path, pointers);

    match &violation.kind {
        SchemaViolationKind::Enum if path.ends_with("/unit/text") => format!(
            "'{}' has invalid value '{}'. Use 'MHz' or 'KHz'.{}",
            path,
            display_value(&violation.data),
            position
        ),
        SchemaViolationKind::Enum => {
            format!("'{}' must be one of the allowed values.{}", path, position)
        }
        SchemaViolationKind::Required { missing_property } => format!(
            "required property '{}' missing at '{}'.{}",
            missing_property, path, position
        ),
        SchemaViolationKind::Type => format!(
            "invalid type for '{}'. {}{}",
            path, violation.message, position
        ),
        SchemaViolationKind::Const { allowed_value } => format!(
            "'{}' must be exactly '{}'.{}",
            path,
            display_value(allowed_value),
            position
        ),
        SchemaViolationKind::AdditionalProperties {
            additional_property,
        } => format!(
            "property '{}' not allowed at '{}'.{}",
            additional_property, path, position
        ),
        SchemaViolationKind::Format { .. } | SchemaViolationKind::Other => {
            format!("{} {}{}", path, violation.message, position)
        }
    }
}

fn position_suffix(path: &str, pointers: Option<&PointerMap>) -> String {
    pointers
        .and_then(|map| map.position_of(path))
        .map(|pos| format!(" (line {}, column {})", pos.line, pos.column))
        .unwrap_or_default()
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
