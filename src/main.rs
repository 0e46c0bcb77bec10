use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use clocktree_validator::{
    Cli, ClockTreeError, ClockTreeValidator, Config, ConfigManager, ErrorReporter, Output,
    ProgressCallback, ReportWriter, SchemaLoader, ValidationEngine, ValidationPhase,
    ValidationProgress, ValidationResults, VerbosityLevel,
};

/// All files valid, or nothing to validate
const EXIT_OK: u8 = 0;
/// At least one file invalid or unreadable
const EXIT_FAILURES: u8 = 1;
/// The run could not start
const EXIT_STARTUP: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            ErrorReporter::new(cli.verbosity()).report_config_error(&e);
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    init_tracing(config.verbosity());
    debug!(?config, "effective configuration");

    let reporter = ErrorReporter::new(config.verbosity());
    match run(&cli, &config).await {
        Ok(results) if results.has_errors() => ExitCode::from(EXIT_FAILURES),
        Ok(_) => ExitCode::from(EXIT_OK),
        Err(e) => {
            match e.downcast_ref::<ClockTreeError>() {
                Some(error) => reporter.report_error(error),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<ValidationResults> {
    let schema = SchemaLoader::load(config.schema.path.as_deref()).await?;
    info!(source = %schema.source(), "schema ready");

    let discovery = config.file_discovery()?;
    let engine = ValidationEngine::new(
        ClockTreeValidator::new(Arc::new(schema)),
        config.engine_config(),
    );

    let progress = config
        .validation
        .show_progress
        .then(|| progress_callback(config.verbosity()));
    let results = engine
        .validate_path_with_progress(&cli.path, &discovery, progress)
        .await?;

    let rendered = Output::new(config.output.format, config.verbosity())
        .render(&results)
        .context("failed to render validation results")?;
    if !rendered.is_empty() {
        println!("{}", rendered.trim_end());
    }

    if let Some(report_dir) = &config.output.report_dir {
        let written = ReportWriter::new(report_dir)
            .write_all(&results)
            .await
            .with_context(|| format!("failed to write reports to {}", report_dir.display()))?;
        for path in written {
            info!(report = %path.display(), "error report written");
        }
    }

    Ok(results)
}

fn progress_callback(verbosity: VerbosityLevel) -> ProgressCallback {
    let reporter = ErrorReporter::new(verbosity);
    Arc::new(move |progress: ValidationProgress| {
        if progress.phase == ValidationPhase::Validation {
            reporter.report_progress(
                progress.completed,
                progress.total,
                progress.current_file.as_deref(),
            );
        }
    })
}
