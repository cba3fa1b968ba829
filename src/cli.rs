//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Plugin Checker - WordPress plugins sorted by last update
///
/// Scans a WordPress plugins directory, asks the WordPress.org plugin
/// repository when each plugin was last updated, and reports which ones
/// have gone stale. Run once to write a report, or serve the report page.
///
/// Examples:
///   plugin-checker --plugins-dir /var/www/wp-content/plugins
///   plugin-checker --plugins-dir ./plugins --format markdown -o report.md
///   plugin-checker --plugins-dir ./plugins --serve --bind 127.0.0.1:8080
///   plugin-checker --plugins-dir ./plugins --dry-run
///   plugin-checker --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// WordPress plugins directory to scan
    ///
    /// Usually `wp-content/plugins`. Not required with --init-config.
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "PLUGIN_CHECKER_PLUGINS_DIR",
        required_unless_present = "init_config"
    )]
    pub plugins_dir: Option<PathBuf>,

    /// Serve the report page instead of writing a report
    #[arg(long, conflicts_with_all = ["dry_run", "fail_on_stale"])]
    pub serve: bool,

    /// Address for the report page (with --serve)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Output file path for the report, or `-` for stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Plugin registry base URL
    ///
    /// Lookups are sent to `<URL>/<slug>.json`.
    #[arg(long, value_name = "URL", env = "PLUGIN_CHECKER_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Registry request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of concurrent registry lookups
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Days without an update after which a plugin is stale
    #[arg(long, value_name = "DAYS")]
    pub stale_days: Option<i64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .plugin-checker.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with code 2 if any plugin is stale
    ///
    /// Useful for scheduled checks and CI pipelines.
    #[arg(long)]
    pub fail_on_stale: bool,

    /// Dry run: list discovered plugins without contacting the registry
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .plugin-checker.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Standalone HTML page (default)
    #[default]
    Html,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.registry_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Registry URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(days) = self.stale_days {
            if !(1..=crate::config::MAX_STALE_DAYS).contains(&days) {
                return Err(format!(
                    "Stale days must be between 1 and {}",
                    crate::config::MAX_STALE_DAYS
                ));
            }
        }

        if self.bind.is_some() && !self.serve {
            return Err("--bind requires --serve".to_string());
        }

        // Validate plugins directory
        if let Some(ref dir) = self.plugins_dir {
            if !dir.exists() {
                return Err(format!(
                    "Plugins directory does not exist: {}",
                    dir.display()
                ));
            }
            if !dir.is_dir() {
                return Err(format!(
                    "Plugins path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
