//! Rendering of batch results on stdout

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::engine::{FileValidationResult, PerformanceMetrics, ValidationResults, ValidationStatus};

pub const NO_FILES_MESSAGE: &str = "no JSON files found";

pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, results: &ValidationResults) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results),
            OutputFormat::Summary => Ok(self.format_summary(results)),
            OutputFormat::Human => Ok(self.format_results(results)),
        }
    }

    pub fn format_results(&self, results: &ValidationResults) -> String {
        let mut output = String::new();

        if results.total_files == 0 {
            output.push_str(NO_FILES_MESSAGE);
            output.push('\n');
            return output;
        }

        match self.verbosity {
            VerbosityLevel::Quiet => {
                for file_result in results.failures() {
                    output.push_str(&self.format_file_result(file_result));
                    output.push('\n');
                }
                if results.has_errors() {
                    output.push_str(&format!(
                        "Invalid: {} Errors: {}\n",
                        results.invalid_files, results.error_files
                    ));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                for file_result in &results.file_results {
                    if self.verbosity >= VerbosityLevel::Verbose || !file_result.status.is_valid()
                    {
                        output.push_str(&self.format_file_result(file_result));
                        output.push('\n');
                    }
                }
                output.push('\n');
                output.push_str(&self.format_summary(results));
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileValidationResult) -> String {
        let path_display = result.path.display();
        let duration_str = format_duration(result.duration);

        match &result.status {
            ValidationStatus::Valid => {
                format!(
                    "{}  {} ({})",
                    self.colorize("✓ VALID", "32"),
                    path_display,
                    duration_str
                )
            }
            ValidationStatus::Invalid { error_count } => {
                let mut output = format!(
                    "{}  {} ({}) - {} error{}",
                    self.colorize("✗ INVALID", "31"),
                    path_display,
                    duration_str,
                    error_count,
                    if *error_count == 1 { "" } else { "s" }
                );

                if self.verbosity >= VerbosityLevel::Normal {
                    for error_detail in &result.error_details {
                        output.push_str(&format!("\n    {}", error_detail));
                    }
                }
                output
            }
            ValidationStatus::Error { message } => {
                format!(
                    "{}  {} ({}) - {}",
                    self.colorize("⚠ ERROR", "33"),
                    path_display,
                    duration_str,
                    message
                )
            }
            ValidationStatus::Skipped { reason } => {
                format!(
                    "{}  {} - {}",
                    self.colorize("- SKIPPED", "36"),
                    path_display,
                    reason
                )
            }
        }
    }

    pub fn format_summary(&self, results: &ValidationResults) -> String {
        if results.total_files == 0 {
            return format!("{}\n", NO_FILES_MESSAGE);
        }

        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total files: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            results.valid_files
        ));

        if results.invalid_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                results.invalid_files
            ));
        }
        if results.error_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_files
            ));
        }
        if results.skipped_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                results.skipped_files
            ));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", results.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.performance_metrics.total_duration)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.format_performance_metrics(&results.performance_metrics));
        }

        output
    }

    fn format_performance_metrics(&self, metrics: &PerformanceMetrics) -> String {
        let mut output = String::new();
        output.push_str("\nPerformance Metrics:\n");
        output.push_str(&format!(
            "  Throughput: {:.1} files/sec\n",
            metrics.throughput_files_per_second
        ));
        output.push_str(&format!(
            "  Concurrent validations: {}\n",
            metrics.concurrent_validations
        ));

        if self.verbosity == VerbosityLevel::Debug {
            output.push_str(&format!(
                "  Discovery: {}\n",
                format_duration(metrics.discovery_duration)
            ));
            output.push_str(&format!(
                "  Validation: {}\n",
                format_duration(metrics.validation_duration)
            ));
            output.push_str(&format!(
                "  Average per file: {}\n",
                format_duration(metrics.average_time_per_file)
            ));
        }
        output
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
