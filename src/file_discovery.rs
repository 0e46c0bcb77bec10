use crate::error::{ClockTreeError, Result};
use globset::{GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Finds clock tree documents under a file or directory
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Accepted file extensions, lowercase, without the dot
    extensions: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    /// Maximum depth for directory traversal (None = unlimited)
    max_depth: Option<usize>,
    follow_symlinks: bool,
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.to_lowercase())
            .collect();
        self
    }

    /// Only keep files matching at least one of these globs
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(&patterns, "include")?;
        Ok(self)
    }

    /// Drop files matching any of these globs
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(&patterns, "exclude")?;
        Ok(self)
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files in the given path (file or directory).
    ///
    /// A file given directly is always returned, whatever its extension. For
    /// a directory the result is sorted so batch output is stable.
    pub async fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| ClockTreeError::FileSystemTraversal {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if metadata.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut read_dir = fs::read_dir(path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path = entry.path();

            if entry_path.is_symlink() && !self.follow_symlinks {
                continue;
            }

            if let Err(e) = self
                .discover_files_recursive(&entry_path, 0, &mut files)
                .await
            {
                warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
            }
        }

        files.sort();
        Ok(files)
    }

    fn discover_files_recursive<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
        files: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(max_depth) = self.max_depth
                && depth > max_depth
            {
                return Ok(());
            }

            let metadata = fs::metadata(path).await?;

            if metadata.is_file() {
                if self.should_process(path) {
                    files.push(path.to_path_buf());
                }
            } else if metadata.is_dir() {
                if let Some(max_depth) = self.max_depth
                    && depth >= max_depth
                {
                    return Ok(());
                }

                let mut read_dir = fs::read_dir(path).await?;

                while let Some(entry) = read_dir.next_entry().await? {
                    let entry_path = entry.path();

                    if entry_path.is_symlink() && !self.follow_symlinks {
                        continue;
                    }

                    if let Err(e) = self
                        .discover_files_recursive(&entry_path, depth + 1, files)
                        .await
                    {
                        warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
                    }
                }
            }

            Ok(())
        })
    }

    /// Check a path against the extension list and glob patterns
    pub fn should_process(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        if !self.extensions.contains(&extension.to_lowercase()) {
            return false;
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: &[String], kind: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ClockTreeError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }

    let set = builder.build().map_err(|e| {
        ClockTreeError::Config(format!("Failed to build {} glob set: {}", kind, e))
    })?;
    Ok(Some(set))
}
