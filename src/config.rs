//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.plugin-checker.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".plugin-checker.toml";

/// Largest accepted staleness threshold, in days.
pub const MAX_STALE_DAYS: i64 = 36_500;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of concurrent registry lookups.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "plugin_report.html".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Plugin registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; lookups go to `<base_url>/<slug>.json`.
    #[serde(default = "default_registry_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every lookup.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_registry_url() -> String {
    "https://api.wordpress.org/plugins/info/1.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("plugin-checker/{}", env!("CARGO_PKG_VERSION"))
}

/// Plugin scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Bytes read from each PHP file when looking for the plugin header.
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            excludes: default_excludes(),
            max_header_bytes: default_max_header_bytes(),
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec!["node_modules", "vendor"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_header_bytes() -> usize {
    8 * 1024
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Plugins not updated for more than this many days are stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stale_days: default_stale_days(),
        }
    }
}

fn default_stale_days() -> i64 {
    crate::analysis::DEFAULT_STALE_DAYS
}

/// Report page server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the report page listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.plugin-checker.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref url) = args.registry_url {
            self.registry.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.registry.timeout_seconds = timeout;
        }

        if let Some(stale_days) = args.stale_days {
            self.report.stale_days = stale_days;
        }

        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
    }

    /// Check the merged settings, whichever source they came from.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            anyhow::bail!("general.concurrency must be at least 1");
        }

        let url = &self.registry.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("registry.base_url must start with 'http://' or 'https://': {}", url);
        }

        if self.registry.timeout_seconds == 0 {
            anyhow::bail!("registry.timeout_seconds must be at least 1");
        }

        if !(1..=MAX_STALE_DAYS).contains(&self.report.stale_days) {
            anyhow::bail!(
                "report.stale_days must be between 1 and {}, got {}",
                MAX_STALE_DAYS,
                self.report.stale_days
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
