//! Per-file error reports
//!
//! Every failing document gets `<report_dir>/<stem>_errors.txt`, a plain text
//! file with a dated header followed by the numbered messages. Documents from
//! different directories that share a stem get `<stem>_2_errors.txt`,
//! `<stem>_3_errors.txt` and so on, in result order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::engine::{FileValidationResult, ValidationResults};
use crate::error::Result;

const RULE: &str = "===========================================";
const THIN_RULE: &str = "-------------------------------------------";

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Report path for a document: `<dir>/<stem>_errors.txt`
    pub fn report_path(&self, document: &Path) -> PathBuf {
        self.numbered_report_path(document, 1)
    }

    fn numbered_report_path(&self, document: &Path, n: usize) -> PathBuf {
        let stem = document
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        if n == 1 {
            self.dir.join(format!("{}_errors.txt", stem))
        } else {
            self.dir.join(format!("{}_{}_errors.txt", stem, n))
        }
    }

    /// First report path for `document` not already in `taken`.
    fn unique_report_path(&self, document: &Path, taken: &mut HashSet<PathBuf>) -> PathBuf {
        let mut n = 1;
        loop {
            let path = self.numbered_report_path(document, n);
            if taken.insert(path.clone()) {
                return path;
            }
            n += 1;
        }
    }

    /// Write one report per failing file; returns the paths written
    pub async fn write_all(&self, results: &ValidationResults) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        let failures: Vec<&FileValidationResult> = results.failures().collect();
        if failures.is_empty() {
            return Ok(written);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let now = Local::now();
        let mut taken = HashSet::new();
        for result in failures {
            let path = self.unique_report_path(&result.path, &mut taken);
            self.write_report(&path, result, now).await?;
            written.push(path);
        }
        Ok(written)
    }

    async fn write_report(
        &self,
        path: &Path,
        result: &FileValidationResult,
        timestamp: DateTime<Local>,
    ) -> Result<()> {
        let file_name = result
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tokio::fs::write(path, render_report(&file_name, &result.error_details, timestamp))
            .await?;
        debug!(report = %path.display(), document = %result.path.display(), "wrote error report");
        Ok(())
    }
}

pub fn render_report(file_name: &str, errors: &[String], timestamp: DateTime<Local>) -> String {
    let mut content = String::new();
    content.push_str(RULE);
    content.push('\n');
    content.push_str(&format!("Date: {}\n", timestamp.format("%Y-%m-%d %H:%M:%S")));
    content.push_str(&format!("File: {}\n", file_name));
    content.push_str(RULE);
    content.push_str("\n\n");
    content.push_str("Errors found during JSON validation:\n\n");

    for (index, error) in errors.iter().enumerate() {
        content.push_str(&format!("{}. {}\n\n", index + 1, error));
    }

    content.push_str(THIN_RULE);
    content.push('\n');
    content.push_str("Please fix these errors before validating again.\n");
    content.push_str(RULE);
    content.push('\n');
    content
}
