use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    #[default]
    Normal,
    /// Show every failing file with its messages
    Verbose,
    /// Also show timing internals
    Debug,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is not set
    pub fn log_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// How batch results are printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Summary,
}

/// Clock tree JSON validator
#[derive(Parser, Debug, Clone)]
#[command(name = "clocktree-validate")]
#[command(
    about = "Validate clock tree JSON documents against the clock tree schema and routing rules"
)]
#[command(version)]
pub struct Cli {
    #[arg(help = "Clock tree file or directory to validate")]
    pub path: PathBuf,

    /// File extensions to process (comma-separated, default "json")
    #[arg(short = 'e', long = "extensions")]
    pub extensions: Option<String>,

    /// Number of files validated concurrently
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Only report failures",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// JSON Schema file replacing the embedded clock tree schema
    #[arg(long = "schema")]
    pub schema: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Maximum directory depth to descend
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Per-file validation timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    #[arg(long = "progress")]
    pub progress: bool,

    /// Stop starting new files after the first failure
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Write `<stem>_errors.txt` for every invalid file into this directory
    #[arg(long = "report-dir")]
    pub report_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|extensions| {
            extensions
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["clocktree-validate", "/tmp"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert_eq!(cli.get_extensions(), None);
        assert_eq!(cli.output_format, None);
        assert!(!cli.fail_fast);
    }

    #[test]
    fn test_full_cli_parsing() {
        let cli = Cli::try_parse_from([
            "clocktree-validate",
            "trees",
            "-e",
            "json, .clk",
            "-t",
            "4",
            "--format",
            "summary",
            "--schema",
            "custom.json",
            "--include",
            "**/stm32*",
            "--exclude",
            "**/old/**",
            "--exclude",
            "**/tmp/**",
            "--max-depth",
            "2",
            "--timeout",
            "5",
            "--fail-fast",
            "--report-dir",
            "errors",
        ])
        .unwrap();

        assert_eq!(
            cli.get_extensions(),
            Some(vec!["json".to_string(), "clk".to_string()])
        );
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.output_format, Some(OutputFormat::Summary));
        assert_eq!(cli.schema, Some(PathBuf::from("custom.json")));
        assert_eq!(cli.exclude_patterns.len(), 2);
        assert_eq!(cli.max_depth, Some(2));
        assert_eq!(cli.timeout, Some(5));
        assert!(cli.fail_fast);
        assert_eq!(cli.report_dir, Some(PathBuf::from("errors")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["clocktree-validate", ".", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_verbosity_and_log_filter() {
        let quiet = Cli::try_parse_from(["clocktree-validate", ".", "-q"]).unwrap();
        assert_eq!(quiet.verbosity(), VerbosityLevel::Quiet);
        assert_eq!(quiet.verbosity().log_filter(), "error");

        let verbose = Cli::try_parse_from(["clocktree-validate", ".", "-v"]).unwrap();
        assert_eq!(verbose.verbosity(), VerbosityLevel::Verbose);
        assert!(VerbosityLevel::Debug > VerbosityLevel::Verbose);
    }

    #[test]
    fn test_validate_rejects_missing_path() {
        let cli = Cli::try_parse_from(["clocktree-validate", "/no/such/clock/tree"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
