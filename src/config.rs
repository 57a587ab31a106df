use crate::cli::{Cli, VerbosityLevel};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration file names searched when `--config` is not given
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "validate-schema.toml",
    "validate-schema.json",
    ".validate-schema.toml",
    ".validate-schema.json",
];

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

/// Main application configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub schemas: SchemaNaming,
    pub policy: PolicyConfig,
    pub output: OutputConfig,
}

/// File-name convention used to tell the two schemas apart
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaNaming {
    /// Marker contained in the main schema's file name
    pub main_marker: String,
    /// Marker contained in the supplementary schema's file name
    pub supplementary_marker: String,
    /// Schema file extension without the leading dot
    pub extension: String,
    /// Compare markers and extension case-sensitively
    pub case_sensitive: bool,
}

/// How to treat an incomplete schema folder
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Fail when no supplementary schema is present
    pub require_supplementary: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (failures only)
    pub quiet: bool,
}

impl Default for SchemaNaming {
    fn default() -> Self {
        Self {
            main_marker: "fsa029".to_string(),
            supplementary_marker: "CommonTypes".to_string(),
            extension: "xsd".to_string(),
            case_sensitive: false,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            require_supplementary: true,
        }
    }
}

impl SchemaNaming {
    /// Whether `file_name` ends with `.{extension}`
    pub fn has_schema_extension(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension);
        if self.case_sensitive {
            file_name.ends_with(&suffix)
        } else {
            file_name
                .to_lowercase()
                .ends_with(&suffix.to_lowercase())
        }
    }

    pub fn mentions_main(&self, text: &str) -> bool {
        self.contains(text, &self.main_marker)
    }

    pub fn mentions_supplementary(&self, text: &str) -> bool {
        self.contains(text, &self.supplementary_marker)
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        if self.case_sensitive {
            haystack.contains(needle)
        } else {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
    }
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    /// Load configuration reading environment overrides from `env`
    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let config_path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                Self::load_from_file(&path).await?
            }
            None => Config::default(),
        };

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    ///
    /// Sections and keys missing from the file keep their defaults.
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find a configuration file in the current directory, then in the
    /// user configuration directory
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            search_dirs.push(config_dir.join("validate-schema"));
        }
        Self::find_config_file_in(&search_dirs)
    }

    /// First existing configuration file, searching `dirs` in order
    pub fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
        dirs.iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Naming settings
        if let Some(marker) = env.get("VALIDATE_SCHEMA_MAIN_MARKER") {
            config.schemas.main_marker = marker;
        }

        if let Some(marker) = env.get("VALIDATE_SCHEMA_SUPPLEMENTARY_MARKER") {
            config.schemas.supplementary_marker = marker;
        }

        if let Some(extension) = env.get("VALIDATE_SCHEMA_EXTENSION") {
            config.schemas.extension = extension;
        }

        if let Some(value) = env.get("VALIDATE_SCHEMA_CASE_SENSITIVE") {
            config.schemas.case_sensitive = parse_env_bool("VALIDATE_SCHEMA_CASE_SENSITIVE", &value)?;
        }

        // Policy settings
        if let Some(value) = env.get("VALIDATE_SCHEMA_REQUIRE_SUPPLEMENTARY") {
            config.policy.require_supplementary =
                parse_env_bool("VALIDATE_SCHEMA_REQUIRE_SUPPLEMENTARY", &value)?;
        }

        // Output settings
        if let Some(value) = env.get("VALIDATE_SCHEMA_VERBOSE") {
            config.output.verbose = parse_env_bool("VALIDATE_SCHEMA_VERBOSE", &value)?;
        }

        if let Some(value) = env.get("VALIDATE_SCHEMA_QUIET") {
            config.output.quiet = parse_env_bool("VALIDATE_SCHEMA_QUIET", &value)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    ///
    /// Flags only ever switch a setting on; an absent flag leaves the
    /// configured value alone.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(marker) = &cli.main_marker {
            config.schemas.main_marker = marker.clone();
        }
        if let Some(marker) = &cli.supplementary_marker {
            config.schemas.supplementary_marker = marker.clone();
        }
        if let Some(extension) = &cli.extension {
            config.schemas.extension = extension.clone();
        }
        if cli.case_sensitive {
            config.schemas.case_sensitive = true;
        }

        if cli.allow_missing_supplementary {
            config.policy.require_supplementary = false;
        }

        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let naming = &config.schemas;

        if naming.main_marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Main schema marker must not be empty".to_string(),
            ));
        }

        if naming.supplementary_marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Supplementary schema marker must not be empty".to_string(),
            ));
        }

        // A main marker containing the supplementary marker matches no main schema
        if naming.mentions_supplementary(&naming.main_marker) {
            return Err(ConfigError::Validation(format!(
                "Main schema marker '{}' must not contain the supplementary marker '{}'",
                naming.main_marker, naming.supplementary_marker
            )));
        }

        let ext = &naming.extension;
        if ext.is_empty() {
            return Err(ConfigError::Validation(
                "Schema file extension must not be empty".to_string(),
            ));
        }
        if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
            return Err(ConfigError::Validation(format!(
                "Invalid schema file extension: {}",
                ext
            )));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Environment(format!(
            "Invalid {} value: {}",
            key, value
        ))),
    }
}
