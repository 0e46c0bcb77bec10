use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::engine::ValidationConfig as EngineConfig;
use crate::file_discovery::FileDiscovery;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_FILE_NAMES: [&str; 4] = [
    "clocktree-validator.toml",
    "clocktree-validator.json",
    ".clocktree-validator.toml",
    ".clocktree-validator.json",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub schema: SchemaConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Files validated concurrently; number of CPUs when unset
    pub threads: Option<usize>,
    /// Per-file timeout
    pub timeout_seconds: u64,
    pub fail_fast: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SchemaConfig {
    /// Replacement for the embedded schema
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    /// Where `<stem>_errors.txt` reports go; no reports when unset
    pub report_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub extensions: Vec<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_depth: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threads: None,
            timeout_seconds: 30,
            fail_fast: false,
            show_progress: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
            max_depth: None,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.output.verbose, self.output.quiet)
    }

    pub fn thread_count(&self) -> usize {
        self.validation.threads.unwrap_or_else(num_cpus::get)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.validation.timeout_seconds)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent_validations: self.thread_count(),
            validation_timeout: self.timeout(),
            fail_fast: self.validation.fail_fast,
            show_progress: self.validation.show_progress,
        }
    }

    pub fn file_discovery(&self) -> crate::error::Result<FileDiscovery> {
        Ok(FileDiscovery::new()
            .with_extensions(self.files.extensions.clone())
            .with_include_patterns(self.files.include_patterns.clone())?
            .with_exclude_patterns(self.files.exclude_patterns.clone())?
            .with_max_depth(self.files.max_depth))
    }
}

/// Loads and layers configuration: defaults, file, environment, CLI
pub struct ConfigManager;

impl ConfigManager {
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = match &cli.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// Look in the current directory, then in the user config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        if let Some(config) = Self::find_config_file_in(Path::new(".")).await? {
            return Ok(Some(config));
        }

        match dirs::config_dir() {
            Some(config_dir) => Self::find_config_file_in(&config_dir.join("clocktree-validator")).await,
            None => Ok(None),
        }
    }

    pub async fn find_config_file_in(dir: &Path) -> Result<Option<Config>> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }
        Ok(None)
    }

    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply `CLOCKTREE_*` overrides read through `env`
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(threads) = parse_env(env, "CLOCKTREE_THREADS")? {
            config.validation.threads = Some(threads);
        }
        if let Some(timeout) = parse_env(env, "CLOCKTREE_TIMEOUT")? {
            config.validation.timeout_seconds = timeout;
        }
        if let Some(fail_fast) = parse_env(env, "CLOCKTREE_FAIL_FAST")? {
            config.validation.fail_fast = fail_fast;
        }

        if let Some(schema) = env.get("CLOCKTREE_SCHEMA") {
            config.schema.path = Some(PathBuf::from(schema));
        }

        if let Some(verbose) = parse_env(env, "CLOCKTREE_VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "CLOCKTREE_QUIET")? {
            config.output.quiet = quiet;
        }
        if let Some(format) = env.get("CLOCKTREE_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                "summary" => OutputFormat::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid CLOCKTREE_FORMAT value: {}",
                        format
                    )));
                }
            };
        }
        if let Some(report_dir) = env.get("CLOCKTREE_REPORT_DIR") {
            config.output.report_dir = Some(PathBuf::from(report_dir));
        }

        if let Some(extensions) = env.get("CLOCKTREE_EXTENSIONS") {
            config.files.extensions = split_list(&extensions);
        }
        if let Some(max_depth) = parse_env(env, "CLOCKTREE_MAX_DEPTH")? {
            config.files.max_depth = Some(max_depth);
        }

        Ok(config)
    }

    /// CLI flags win over everything that was given explicitly
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        if let Some(timeout) = cli.timeout {
            config.validation.timeout_seconds = timeout;
        }
        config.validation.fail_fast |= cli.fail_fast;
        config.validation.show_progress |= cli.progress;

        if cli.schema.is_some() {
            config.schema.path = cli.schema.clone();
        }

        if let Some(format) = cli.output_format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        if cli.report_dir.is_some() {
            config.output.report_dir = cli.report_dir.clone();
        }

        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }

        config
    }

    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.validation.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
    env.get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
        })
        .transpose()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["clocktree-validate"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.validation.threads, None);
        assert_eq!(config.validation.timeout_seconds, 30);
        assert!(!config.validation.fail_fast);
        assert_eq!(config.schema.path, None);
        assert_eq!(config.output.format, OutputFormat::Human);
        assert_eq!(config.output.report_dir, None);
        assert_eq!(config.files.extensions, vec!["json"]);
        assert_eq!(config.files.max_depth, None);
        assert_eq!(config.verbosity(), VerbosityLevel::Normal);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[validation]
threads = 8
timeout_seconds = 10
fail_fast = true

[schema]
path = "/etc/clocktree/schema.json"

[output]
format = "json"
verbose = true
report_dir = "errors"

[files]
extensions = ["json", "clk"]
exclude_patterns = ["**/archive/**"]
max_depth = 3
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.validation.threads, Some(8));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validation.fail_fast);
        assert!(!config.validation.show_progress);
        assert_eq!(
            config.schema.path,
            Some(PathBuf::from("/etc/clocktree/schema.json"))
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.report_dir, Some(PathBuf::from("errors")));
        assert_eq!(config.files.extensions, vec!["json", "clk"]);
        assert!(config.files.include_patterns.is_empty());
        assert_eq!(config.files.max_depth, Some(3));
    }

    #[tokio::test]
    async fn test_load_partial_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{ "output": { "format": "summary" } }"#).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.output.format, OutputFormat::Summary);
        assert_eq!(config.validation, ValidationConfig::default());
        assert_eq!(config.files, FileConfig::default());
    }

    #[tokio::test]
    async fn test_unsupported_and_malformed_files() {
        let temp_dir = TempDir::new().unwrap();

        let yaml = temp_dir.path().join("config.yaml");
        fs::write(&yaml, "threads: 4").unwrap();
        assert!(matches!(
            ConfigManager::load_from_file(&yaml).await,
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));

        let broken = temp_dir.path().join("config.toml");
        fs::write(&broken, "[validation\nthreads = ").unwrap();
        assert!(matches!(
            ConfigManager::load_from_file(&broken).await,
            Err(ConfigError::TomlParsing(_))
        ));
    }

    #[tokio::test]
    async fn test_find_config_file_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(
            ConfigManager::find_config_file_in(temp_dir.path())
                .await
                .unwrap()
                .is_none()
        );

        fs::write(
            temp_dir.path().join(".clocktree-validator.toml"),
            "[validation]\nthreads = 3\n",
        )
        .unwrap();
        let found = ConfigManager::find_config_file_in(temp_dir.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.validation.threads, Some(3));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::default();
        env.set("CLOCKTREE_THREADS", "6");
        env.set("CLOCKTREE_TIMEOUT", "12");
        env.set("CLOCKTREE_FAIL_FAST", "true");
        env.set("CLOCKTREE_SCHEMA", "/opt/schema.json");
        env.set("CLOCKTREE_FORMAT", "JSON");
        env.set("CLOCKTREE_EXTENSIONS", "json, clk,");
        env.set("CLOCKTREE_MAX_DEPTH", "2");
        env.set("CLOCKTREE_REPORT_DIR", "out");

        let config =
            ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();

        assert_eq!(config.validation.threads, Some(6));
        assert_eq!(config.validation.timeout_seconds, 12);
        assert!(config.validation.fail_fast);
        assert_eq!(config.schema.path, Some(PathBuf::from("/opt/schema.json")));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.files.extensions, vec!["json", "clk"]);
        assert_eq!(config.files.max_depth, Some(2));
        assert_eq!(config.output.report_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut env = MockEnvProvider::default();
        env.set("CLOCKTREE_THREADS", "many");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(msg)) if msg.contains("CLOCKTREE_THREADS")));

        let mut env = MockEnvProvider::default();
        env.set("CLOCKTREE_FORMAT", "table");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));
    }

    #[test]
    fn test_cli_takes_precedence() {
        let mut config = Config::default();
        config.validation.threads = Some(2);
        config.output.quiet = true;
        config.files.extensions = vec!["clk".to_string()];
        config.files.include_patterns = vec!["**/a*".to_string()];

        let cli = cli(&[
            "trees", "-t", "9", "-v", "-e", "json", "--format", "summary", "--max-depth", "1",
        ]);
        let merged = ConfigManager::merge_with_cli(config, &cli);

        assert_eq!(merged.validation.threads, Some(9));
        assert!(merged.output.verbose);
        assert!(!merged.output.quiet);
        assert_eq!(merged.output.format, OutputFormat::Summary);
        assert_eq!(merged.files.extensions, vec!["json"]);
        assert_eq!(merged.files.include_patterns, vec!["**/a*"]);
        assert_eq!(merged.files.max_depth, Some(1));
    }

    #[test]
    fn test_cli_absent_flags_keep_file_values() {
        let mut config = Config::default();
        config.validation.fail_fast = true;
        config.output.report_dir = Some(PathBuf::from("reports"));

        let merged = ConfigManager::merge_with_cli(config, &cli(&["trees"]));
        assert!(merged.validation.fail_fast);
        assert_eq!(merged.output.report_dir, Some(PathBuf::from("reports")));
        assert_eq!(merged.files.extensions, vec!["json"]);
    }

    #[tokio::test]
    async fn test_load_config_layers() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("layers.toml");
        fs::write(
            &config_path,
            "[validation]\nthreads = 2\ntimeout_seconds = 5\n[output]\nformat = \"summary\"\n",
        )
        .unwrap();

        let mut env = MockEnvProvider::default();
        env.set("CLOCKTREE_THREADS", "4");
        env.set("CLOCKTREE_TIMEOUT", "7");

        let path = config_path.to_string_lossy().to_string();
        let cli = cli(&["trees", "--config", &path, "--timeout", "11"]);
        let config = ConfigManager::load_config_with(&cli, &env).await.unwrap();

        assert_eq!(config.validation.threads, Some(4));
        assert_eq!(config.validation.timeout_seconds, 11);
        assert_eq!(config.output.format, OutputFormat::Summary);
    }

    #[test]
    fn test_validate_config_rules() {
        let mut config = Config::default();
        config.validation.threads = Some(0);
        assert!(ConfigManager::validate_config(&config).is_err());
        config.validation.threads = Some(1001);
        assert!(ConfigManager::validate_config(&config).is_err());
        config.validation.threads = Some(1000);
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut config = Config::default();
        config.validation.timeout_seconds = 0;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.files.extensions.clear();
        assert!(ConfigManager::validate_config(&config).is_err());

        for bad in ["a/b", "a\\b", ".json"] {
            let mut config = Config::default();
            config.files.extensions = vec![bad.to_string()];
            assert!(
                matches!(
                    ConfigManager::validate_config(&config),
                    Err(ConfigError::Validation(msg)) if msg.contains(bad)
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_engine_config_and_discovery() {
        let mut config = Config::default();
        config.validation.threads = Some(3);
        config.validation.fail_fast = true;
        config.files.extensions = vec!["clk".to_string()];

        let engine = config.engine_config();
        assert_eq!(engine.max_concurrent_validations, 3);
        assert_eq!(engine.validation_timeout, Duration::from_secs(30));
        assert!(engine.fail_fast);

        let discovery = config.file_discovery().unwrap();
        assert_eq!(discovery.extensions(), ["clk"]);

        config.files.exclude_patterns = vec!["[".to_string()];
        assert!(config.file_discovery().is_err());
    }
}
