//! Plugin Checker - WordPress plugins sorted by last update
//!
//! A CLI tool that scans a WordPress plugins directory, looks up each
//! plugin on the WordPress.org plugin repository, and reports which
//! plugins have not been updated recently. It can also serve a report
//! page that runs the check on demand.
//!
//! Exit codes:
//!   0 - Success (no stale plugins, or no --fail-on-stale set)
//!   1 - Runtime error (bad config, unreadable plugins directory, etc.)
//!   2 - Stale plugins found with --fail-on-stale

mod analysis;
mod cli;
mod config;
mod models;
mod registry;
mod report;
mod scanner;
mod server;

#[cfg(test)]
mod test_helpers;

use analysis::{Aggregator, AggregatorConfig};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use registry::WpOrgRegistry;
use scanner::{PluginScanner, ScanConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `verbose` in the file applies
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        eprintln!("Error: invalid configuration: {:#}", e);
        std::process::exit(1);
    }

    init_logging(&args, &config);

    info!("Plugin Checker v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Plugin check failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .plugin-checker.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the registry, stale threshold, and server address.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}

/// Run the selected mode. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let plugins_dir = args
        .plugins_dir
        .clone()
        .context("--plugins-dir is required")?;
    let scan_config = ScanConfig::from(&config.scanner);

    // Handle --dry-run: list plugins and exit
    if args.dry_run {
        return handle_dry_run(&plugins_dir, scan_config);
    }

    let registry = WpOrgRegistry::new(
        &config.registry.base_url,
        Duration::from_secs(config.registry.timeout_seconds),
        &config.registry.user_agent,
    )?;

    let aggregator_config = AggregatorConfig {
        concurrency: config.general.concurrency,
        stale_days: config.report.stale_days,
    };

    if args.serve {
        let state = server::AppState {
            registry: Arc::new(registry),
            plugins_dir,
            scan_config,
            aggregator_config,
        };
        server::run_server(&config.server.bind, state).await?;
        return Ok(0);
    }

    run_check(&args, &config, &plugins_dir, scan_config, &registry, aggregator_config).await
}

/// One-shot check: scan, look up, render, and write the report.
async fn run_check(
    args: &Args,
    config: &Config,
    plugins_dir: &Path,
    scan_config: ScanConfig,
    registry: &WpOrgRegistry,
    aggregator_config: AggregatorConfig,
) -> Result<i32> {
    let output = resolve_output(config, args.format);
    let to_stdout = output.as_os_str() == "-";
    let chatty = !args.quiet && !to_stdout;

    // Step 1: Discover plugins
    if chatty {
        println!("🔍 Scanning plugins: {}", plugins_dir.display());
    }
    let plugins = PluginScanner::new(plugins_dir.to_path_buf(), scan_config).scan()?;
    info!("Found {} plugins", plugins.len());

    // Step 2: Look up every plugin
    if chatty {
        println!("🌐 Checking {} plugins against {}", plugins.len(), config.registry.base_url);
    }

    let mut aggregator = Aggregator::new(registry, aggregator_config);
    let progress = if chatty {
        let pb = ProgressBar::new(plugins.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        aggregator = aggregator.with_progress(pb.clone());
        Some(pb)
    } else {
        None
    };

    let report = aggregator.run(plugins_dir, &plugins, Utc::now()).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // Step 3: Render and save the report
    let rendered = match args.format {
        OutputFormat::Html => report::generate_html_document(&report),
        OutputFormat::Markdown => report::generate_markdown_report(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    if to_stdout {
        println!("{}", rendered);
    } else {
        std::fs::write(&output, &rendered)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
    }

    if chatty {
        let summary = &report.summary;
        println!("\n📊 Plugin Summary:");
        println!("   Plugins found: {}", report.metadata.plugins_discovered);
        println!("   Plugins reported: {}", summary.total);
        println!(
            "   - 🔴 Stale: {} | 🟡 Indeterminate: {} | 🟢 Current: {}",
            summary.stale, summary.indeterminate, summary.current
        );
        if report.metadata.plugins_skipped > 0 {
            println!("   Skipped: {}", report.metadata.plugins_skipped);
        }
        println!("   Duration: {:.1}s", report.metadata.duration_seconds);
        println!("\n✅ Check complete! Report saved to: {}", output.display());
    }

    if args.fail_on_stale && report.has_stale() {
        eprintln!(
            "\n⛔ {} stale plugin(s) found. Failing (exit code 2).",
            report.summary.stale
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: scan plugins, print what would be checked, exit.
fn handle_dry_run(plugins_dir: &Path, scan_config: ScanConfig) -> Result<i32> {
    println!("\n🔍 Dry run: scanning plugins (no registry calls)...\n");

    let plugins = PluginScanner::new(plugins_dir.to_path_buf(), scan_config).scan()?;

    if plugins.is_empty() {
        println!("   No plugins found.");
    } else {
        println!("   Found {} plugins:\n", plugins.len());
        for plugin in &plugins {
            let slug = plugin.slug();
            if slug.is_empty() {
                println!("     🔌 {} ({}, no slug: skipped)", plugin.name, plugin.path);
            } else {
                println!("     🔌 {} ({}, slug: {})", plugin.name, plugin.path, slug);
            }
        }
        println!("\n   Total: {} plugins", plugins.len());
    }

    println!("\n✅ Dry run complete. No registry calls were made.");
    Ok(0)
}

/// Pick the output path, matching its extension to the format when it
/// still carries the default `.html` one.
fn resolve_output(config: &Config, format: OutputFormat) -> PathBuf {
    let output = PathBuf::from(&config.general.output);
    let is_html = output
        .extension()
        .map(|ext| ext == "html")
        .unwrap_or(false);

    if is_html && format != OutputFormat::Html {
        output.with_extension(format.extension())
    } else {
        output
    }
}
