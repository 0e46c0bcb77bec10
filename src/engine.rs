//! Batch validation engine
//!
//! Runs [`ClockTreeValidator`] over many files:
//! - **Async I/O**: discovery and file reads on the tokio runtime
//! - **Blocking CPU work**: each document is validated inside `spawn_blocking`
//! - **Bounded concurrency**: a semaphore caps the number of files in flight
//! - **Per-file timeout**: imposed here, outside the validation core
//!
//! Results come back in the same order as the input file list.

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClockTreeError, Result};
use crate::file_discovery::FileDiscovery;
use crate::validator::ClockTreeValidator;

/// Reason recorded for files never started because of `fail_fast`.
pub const FAIL_FAST_REASON: &str = "skipped after an earlier failure (fail-fast)";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Number of files validated at the same time
    pub max_concurrent_validations: usize,
    /// Time allowed for reading and validating one file
    pub validation_timeout: Duration,
    /// Skip files not yet started once one file fails
    pub fail_fast: bool,
    pub show_progress: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: num_cpus::get(),
            validation_timeout: Duration::from_secs(30),
            fail_fast: false,
            show_progress: false,
        }
    }
}

/// Status of a single file validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Valid,
    /// The document was read and has violations
    Invalid { error_count: usize },
    /// The file could not be read or the validation did not finish
    Error { message: String },
    Skipped { reason: String },
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationStatus::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationStatus::Error { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ValidationStatus::Skipped { .. })
    }

    /// Invalid or errored; both count against the exit code
    pub fn is_failure(&self) -> bool {
        self.is_invalid() || self.is_error()
    }
}

/// Result of validating a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidationResult {
    pub path: PathBuf,
    pub status: ValidationStatus,
    pub duration: Duration,
    /// Messages produced for the file, in report order
    pub error_details: Vec<String>,
}

impl FileValidationResult {
    pub fn valid(path: PathBuf, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Valid,
            duration,
            error_details: Vec::new(),
        }
    }

    pub fn invalid(path: PathBuf, errors: Vec<String>, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Invalid {
                error_count: errors.len(),
            },
            duration,
            error_details: errors,
        }
    }

    pub fn error(path: PathBuf, message: String, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Error {
                message: message.clone(),
            },
            duration,
            error_details: vec![message],
        }
    }

    pub fn skipped(path: PathBuf, reason: String) -> Self {
        Self {
            path,
            status: ValidationStatus::Skipped { reason },
            duration: Duration::ZERO,
            error_details: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationProgress {
    pub current_file: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    pub phase: ValidationPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPhase {
    Discovery,
    Validation,
    Complete,
}

/// Timing of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_duration: Duration,
    pub discovery_duration: Duration,
    pub validation_duration: Duration,
    pub average_time_per_file: Duration,
    pub throughput_files_per_second: f64,
    pub concurrent_validations: usize,
}

/// Aggregated results of validating multiple files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResults {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub error_files: usize,
    pub skipped_files: usize,
    /// Sum of per-file durations
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub file_results: Vec<FileValidationResult>,
    pub performance_metrics: PerformanceMetrics,
}

impl ValidationResults {
    pub fn aggregate(file_results: Vec<FileValidationResult>) -> Self {
        let total_files = file_results.len();
        let mut valid_files = 0;
        let mut invalid_files = 0;
        let mut error_files = 0;
        let mut skipped_files = 0;
        let mut total_duration = Duration::ZERO;

        for result in &file_results {
            match result.status {
                ValidationStatus::Valid => valid_files += 1,
                ValidationStatus::Invalid { .. } => invalid_files += 1,
                ValidationStatus::Error { .. } => error_files += 1,
                ValidationStatus::Skipped { .. } => skipped_files += 1,
            }
            total_duration += result.duration;
        }

        let average_duration = if total_files > 0 {
            total_duration / total_files as u32
        } else {
            Duration::ZERO
        };

        let performance_metrics = PerformanceMetrics {
            total_duration,
            validation_duration: total_duration,
            average_time_per_file: average_duration,
            throughput_files_per_second: throughput(total_files, total_duration),
            concurrent_validations: 1,
            ..PerformanceMetrics::default()
        };

        Self {
            total_files,
            valid_files,
            invalid_files,
            error_files,
            skipped_files,
            total_duration,
            average_duration,
            file_results,
            performance_metrics,
        }
    }

    pub fn with_metrics(
        file_results: Vec<FileValidationResult>,
        performance_metrics: PerformanceMetrics,
    ) -> Self {
        let mut results = Self::aggregate(file_results);
        results.performance_metrics = performance_metrics;
        results
    }

    pub fn all_valid(&self) -> bool {
        self.valid_files == self.total_files && self.total_files > 0
    }

    pub fn has_errors(&self) -> bool {
        self.error_files > 0 || self.invalid_files > 0
    }

    /// Percentage of files that validated cleanly
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.valid_files as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileValidationResult> {
        self.file_results
            .iter()
            .filter(|result| result.status.is_failure())
    }
}

fn throughput(files: usize, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        files as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync>;

pub struct ValidationEngine {
    validator: Arc<ClockTreeValidator>,
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(validator: ClockTreeValidator, config: ValidationConfig) -> Self {
        Self {
            validator: Arc::new(validator),
            config,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub async fn validate_path(
        &self,
        path: &Path,
        file_discovery: &FileDiscovery,
    ) -> Result<ValidationResults> {
        self.validate_path_with_progress(path, file_discovery, None)
            .await
    }

    /// Discover the files under `path` and validate all of them
    pub async fn validate_path_with_progress(
        &self,
        path: &Path,
        file_discovery: &FileDiscovery,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ValidationResults> {
        let workflow_start = Instant::now();
        let mut metrics = PerformanceMetrics {
            concurrent_validations: self.config.max_concurrent_validations,
            ..PerformanceMetrics::default()
        };

        if let Some(ref callback) = progress_callback {
            callback(ValidationProgress {
                current_file: None,
                completed: 0,
                total: 0,
                phase: ValidationPhase::Discovery,
            });
        }

        let discovery_start = Instant::now();
        let files = file_discovery.discover_files(path).await?;
        metrics.discovery_duration = discovery_start.elapsed();
        debug!(files = files.len(), path = %path.display(), "discovered files");

        let validation_start = Instant::now();
        let results = self
            .validate_files_with_progress(files, progress_callback.clone())
            .await?;
        metrics.validation_duration = validation_start.elapsed();

        metrics.total_duration = workflow_start.elapsed();
        metrics.average_time_per_file = if !results.is_empty() {
            metrics.validation_duration / results.len() as u32
        } else {
            Duration::ZERO
        };
        metrics.throughput_files_per_second = throughput(results.len(), metrics.total_duration);

        let final_results = ValidationResults::with_metrics(results, metrics);
        info!(
            total = final_results.total_files,
            valid = final_results.valid_files,
            invalid = final_results.invalid_files,
            errors = final_results.error_files,
            skipped = final_results.skipped_files,
            "validation finished"
        );

        if let Some(ref callback) = progress_callback {
            callback(ValidationProgress {
                current_file: None,
                completed: final_results.total_files,
                total: final_results.total_files,
                phase: ValidationPhase::Complete,
            });
        }

        Ok(final_results)
    }

    pub async fn validate_files(&self, files: Vec<PathBuf>) -> Result<Vec<FileValidationResult>> {
        self.validate_files_with_progress(files, None).await
    }

    /// Validate a list of files concurrently, preserving input order
    pub async fn validate_files_with_progress(
        &self,
        files: Vec<PathBuf>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Vec<FileValidationResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let total_files = files.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.config.max_concurrent_validations.max(1),
        ));

        let validation_tasks: Vec<_> = files
            .into_iter()
            .map(|file_path| {
                let validator = Arc::clone(&self.validator);
                let semaphore = Arc::clone(&semaphore);
                let timeout = self.config.validation_timeout;
                let fail_fast = self.config.fail_fast;
                let progress_callback = progress_callback.clone();
                let completed = Arc::clone(&completed);
                let failed = Arc::clone(&failed);

                tokio::spawn(async move {
                    let _permit =
                        semaphore
                            .acquire()
                            .await
                            .map_err(|_| ClockTreeError::Concurrency {
                                details: "validation semaphore closed".to_string(),
                            })?;

                    let result = if fail_fast && failed.load(Ordering::SeqCst) {
                        FileValidationResult::skipped(
                            file_path.clone(),
                            FAIL_FAST_REASON.to_string(),
                        )
                    } else {
                        let start = Instant::now();
                        match tokio::time::timeout(
                            timeout,
                            Self::validate_single_file_internal(file_path.clone(), validator),
                        )
                        .await
                        {
                            Ok(result) => result,
                            Err(_) => FileValidationResult::error(
                                file_path.clone(),
                                format!("validation timed out after {:?}", timeout),
                                start.elapsed(),
                            ),
                        }
                    };

                    if result.status.is_failure() {
                        failed.store(true, Ordering::SeqCst);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = progress_callback {
                        callback(ValidationProgress {
                            current_file: Some(file_path),
                            completed: done,
                            total: total_files,
                            phase: ValidationPhase::Validation,
                        });
                    }

                    Ok::<FileValidationResult, ClockTreeError>(result)
                })
            })
            .collect();

        let task_results =
            try_join_all(validation_tasks)
                .await
                .map_err(|e| ClockTreeError::Concurrency {
                    details: format!("Task join error: {}", e),
                })?;

        task_results.into_iter().collect()
    }

    async fn validate_single_file_internal(
        file_path: PathBuf,
        validator: Arc<ClockTreeValidator>,
    ) -> FileValidationResult {
        let start_time = Instant::now();

        let bytes = match tokio::fs::read(&file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return FileValidationResult::error(
                    file_path,
                    format!("error reading or parsing the JSON file: {}", e),
                    start_time.elapsed(),
                );
            }
        };

        let outcome =
            tokio::task::spawn_blocking(move || validator.validate_bytes(&bytes)).await;
        let duration = start_time.elapsed();

        match outcome {
            Ok(outcome) if outcome.valid => {
                debug!(path = %file_path.display(), ?duration, "valid");
                FileValidationResult::valid(file_path, duration)
            }
            Ok(outcome) => {
                debug!(
                    path = %file_path.display(),
                    errors = outcome.errors.len(),
                    "invalid"
                );
                FileValidationResult::invalid(file_path, outcome.errors, duration)
            }
            Err(e) => FileValidationResult::error(
                file_path,
                format!("validation task failed: {}", e),
                duration,
            ),
        }
    }

    pub async fn validate_single_file(&self, file_path: &Path) -> FileValidationResult {
        Self::validate_single_file_internal(file_path.to_path_buf(), Arc::clone(&self.validator))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_loader::CompiledSchema;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const VALID: &str = r#"{
  "tree": {
    "id": "t",
    "schema_version": "1.0",
    "elements": [
      {
        "id": "hse",
        "name": "HSE",
        "position": { "x": 0, "y": 0 },
        "type": "fixedSource",
        "label": { "align": "left", "text": "HSE" },
        "default": 8,
        "size": { "width": 10, "height": 10 }
      }
    ],
    "transitions": []
  }
}"#;

    fn engine(config: ValidationConfig) -> ValidationEngine {
        let schema = Arc::new(CompiledSchema::embedded().unwrap());
        ValidationEngine::new(ClockTreeValidator::new(schema), config)
    }

    async fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[test]
    fn test_status_predicates() {
        assert!(ValidationStatus::Valid.is_valid());
        assert!(ValidationStatus::Invalid { error_count: 2 }.is_failure());
        assert!(
            ValidationStatus::Error {
                message: "x".to_string()
            }
            .is_failure()
        );
        let skipped = ValidationStatus::Skipped {
            reason: "x".to_string(),
        };
        assert!(skipped.is_skipped());
        assert!(!skipped.is_failure());
    }

    #[test]
    fn test_aggregate_counts() {
        let results = ValidationResults::aggregate(vec![
            FileValidationResult::valid(PathBuf::from("a.json"), Duration::from_millis(10)),
            FileValidationResult::invalid(
                PathBuf::from("b.json"),
                vec!["bad".to_string()],
                Duration::from_millis(20),
            ),
            FileValidationResult::error(
                PathBuf::from("c.json"),
                "unreadable".to_string(),
                Duration::from_millis(30),
            ),
            FileValidationResult::skipped(PathBuf::from("d.json"), "later".to_string()),
        ]);

        assert_eq!(results.total_files, 4);
        assert_eq!(results.valid_files, 1);
        assert_eq!(results.invalid_files, 1);
        assert_eq!(results.error_files, 1);
        assert_eq!(results.skipped_files, 1);
        assert_eq!(results.total_duration, Duration::from_millis(60));
        assert_eq!(results.average_duration, Duration::from_millis(15));
        assert_eq!(results.success_rate(), 25.0);
        assert!(results.has_errors());
        assert!(!results.all_valid());
        assert_eq!(results.failures().count(), 2);
    }

    #[test]
    fn test_aggregate_empty() {
        let results = ValidationResults::aggregate(Vec::new());
        assert_eq!(results.total_files, 0);
        assert_eq!(results.success_rate(), 0.0);
        assert!(!results.all_valid());
        assert!(!results.has_errors());
    }

    #[tokio::test]
    async fn test_validate_files_preserves_order() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.json", VALID).await;
        let broken = write(&dir, "broken.json", "{").await;
        let missing = dir.path().join("missing.json");

        let results = engine(ValidationConfig::default())
            .validate_files(vec![broken.clone(), good.clone(), missing.clone()])
            .await
            .unwrap();

        assert_eq!(results[0].path, broken);
        assert_eq!(results[0].status, ValidationStatus::Invalid { error_count: 1 });
        assert!(results[0].error_details[0].starts_with("error reading or parsing the JSON file:"));
        assert_eq!(results[1].status, ValidationStatus::Valid);
        assert!(results[2].status.is_error());
    }

    #[tokio::test]
    async fn test_fail_fast_skips_pending_files() {
        let dir = TempDir::new().unwrap();
        let mut files = vec![write(&dir, "a.json", "[]").await];
        for i in 0..5 {
            files.push(write(&dir, &format!("ok{i}.json"), VALID).await);
        }

        let config = ValidationConfig {
            max_concurrent_validations: 1,
            fail_fast: true,
            ..ValidationConfig::default()
        };
        let results = engine(config).validate_files(files).await.unwrap();

        assert!(results[0].status.is_invalid());
        assert!(results[1..].iter().all(|r| r.status.is_skipped()));
    }

    #[tokio::test]
    async fn test_validate_path_with_progress() {
        let dir = TempDir::new().unwrap();
        write(&dir, "one.json", VALID).await;
        write(&dir, "two.json", VALID).await;
        write(&dir, "readme.md", "# not a tree").await;

        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let callback: ProgressCallback = Arc::new(move |progress: ValidationProgress| {
            sink.lock().unwrap().push(progress.phase);
        });

        let results = engine(ValidationConfig::default())
            .validate_path_with_progress(dir.path(), &FileDiscovery::new(), Some(callback))
            .await
            .unwrap();

        assert_eq!(results.total_files, 2);
        assert!(results.all_valid());

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&ValidationPhase::Discovery));
        assert_eq!(phases.last(), Some(&ValidationPhase::Complete));
        assert_eq!(
            phases
                .iter()
                .filter(|p| **p == ValidationPhase::Validation)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_empty_directory_yields_no_results() {
        let dir = TempDir::new().unwrap();
        let results = engine(ValidationConfig::default())
            .validate_path(dir.path(), &FileDiscovery::new())
            .await
            .unwrap();
        assert_eq!(results.total_files, 0);
        assert!(!results.has_errors());
    }
}
