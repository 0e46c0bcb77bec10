use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::ClockTreeError;
use std::path::Path;

/// Writes operational errors and progress to stderr at a chosen verbosity.
///
/// Problems found inside documents are not routed here; they belong to
/// [`crate::output::Output`].
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
}

impl ErrorReporter {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: false,
        }
    }

    pub fn with_timestamps(verbosity: VerbosityLevel, show_timestamps: bool) -> Self {
        Self {
            verbosity,
            show_timestamps,
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn report_error(&self, error: &ClockTreeError) {
        if let Some(message) = self.format_error(error) {
            eprintln!("{}", message);
        }
    }

    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("{}", self.format_config_error(error));
    }

    /// Render an operational error; `None` when the verbosity hides it
    pub fn format_error(&self, error: &ClockTreeError) -> Option<String> {
        match self.verbosity {
            VerbosityLevel::Quiet => self
                .is_critical_error(error)
                .then(|| format!("ERROR: {}", error)),
            VerbosityLevel::Normal => Some(self.format_error_normal(error)),
            VerbosityLevel::Verbose => Some(self.format_error_verbose(error)),
            VerbosityLevel::Debug => Some(self.format_error_debug(error)),
        }
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!(
                    "Configuration Error: {}\n{}",
                    error,
                    self.get_config_help(error)
                )
            }
            VerbosityLevel::Debug => {
                format!(
                    "Configuration Error: {}\nDebug: {:?}\n{}",
                    error,
                    error,
                    self.get_config_help(error)
                )
            }
        }
    }

    /// Single-line progress on stderr, rewritten in place
    pub fn report_progress(&self, current: usize, total: usize, current_file: Option<&Path>) {
        if self.verbosity == VerbosityLevel::Quiet || total == 0 {
            return;
        }

        let percentage = (current as f64 / total as f64 * 100.0) as u32;

        match (self.verbosity, current_file) {
            (VerbosityLevel::Verbose | VerbosityLevel::Debug, Some(file)) => {
                eprint!(
                    "\rProgress: {}/{} ({}%) - {}",
                    current,
                    total,
                    percentage,
                    file.display()
                );
            }
            _ => eprint!("\rProgress: {}/{} ({}%)", current, total, percentage),
        }

        if current == total {
            eprintln!();
        }
    }

    /// Errors that stop the run outright
    fn is_critical_error(&self, error: &ClockTreeError) -> bool {
        matches!(
            error,
            ClockTreeError::Config(_)
                | ClockTreeError::SchemaRead { .. }
                | ClockTreeError::SchemaCompile { .. }
                | ClockTreeError::Concurrency { .. }
        )
    }

    fn format_error_normal(&self, error: &ClockTreeError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        format!("{}{}", timestamp, error)
    }

    fn format_error_verbose(&self, error: &ClockTreeError) -> String {
        let mut output = self.format_error_normal(error);

        match error {
            ClockTreeError::SchemaRead { path, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Check that {} exists and contains a JSON Schema",
                    path.display()
                ));
            }
            ClockTreeError::SchemaCompile { .. } => {
                output.push_str(
                    "\nSuggestion: The schema must be a valid JSON Schema (draft-07 or later)",
                );
            }
            ClockTreeError::FileSystemTraversal { path, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Verify that {} exists and is readable",
                    path.display()
                ));
            }
            _ => {}
        }

        output
    }

    fn format_error_debug(&self, error: &ClockTreeError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::Validation(_) => {
                "Adjust the value in the configuration file, CLOCKTREE_* variables or flags"
                    .to_string()
            }
            ConfigError::Environment(_) => {
                "Fix or unset the offending CLOCKTREE_* environment variable".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
        }
    }
}
