//! # clocktree-validator
//!
//! Validation of clock tree JSON documents: JSON Schema conformance with
//! source positions, then graph consistency of elements, transitions and
//! multiplexor routing. A batch engine runs the validator concurrently over
//! files and directories.

pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod error_reporter;
pub mod file_discovery;
pub mod formatter;
pub mod graph;
pub mod model;
pub mod output;
pub mod report;
pub mod schema_loader;
pub mod source_map;
pub mod validator;

pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager, EnvProvider, SystemEnvProvider};
pub use document::ClockTreeDocument;
pub use engine::{
    FileValidationResult, PerformanceMetrics, ProgressCallback, ValidationConfig, ValidationEngine,
    ValidationPhase, ValidationProgress, ValidationResults, ValidationStatus,
};
pub use error::{ClockTreeError, Result};
pub use error_reporter::ErrorReporter;
pub use file_discovery::FileDiscovery;
pub use formatter::{RawViolation, SchemaViolationKind, format_violation};
pub use graph::{GraphReport, check_graph};
pub use output::Output;
pub use report::ReportWriter;
pub use schema_loader::{CompiledSchema, SchemaLoader, SchemaSource};
pub use source_map::{ParseError, ParsedDocument, PointerMap, Position, parse_with_positions};
pub use validator::{ClockTreeValidator, ValidationOutcome};
