//! Plugin scanner for discovering installed plugins.
//!
//! Plugins live either as a single PHP file at the root of the plugins
//! directory or as a PHP file one directory down. A file counts as a
//! plugin when its header block declares a `Plugin Name:`.

use crate::models::PluginDescriptor;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Errors that stop a scan entirely.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("plugins directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("plugins path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot read plugins directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for plugin scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory or file names to skip (e.g. ["node_modules"])
    pub excludes: Vec<String>,
    /// How much of each file is searched for the header
    pub max_header_bytes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excludes: vec!["node_modules", "vendor"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_header_bytes: 8 * 1024,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            excludes: config.excludes.clone(),
            max_header_bytes: config.max_header_bytes,
        }
    }
}

/// Scanner over a plugins directory.
pub struct PluginScanner {
    config: ScanConfig,
    plugins_dir: PathBuf,
}

impl PluginScanner {
    /// Create a new plugin scanner.
    pub fn new(plugins_dir: PathBuf, config: ScanConfig) -> Self {
        Self {
            config,
            plugins_dir,
        }
    }

    /// Discover all installed plugins, ordered by name.
    pub fn scan(&self) -> Result<Vec<PluginDescriptor>, ScanError> {
        self.check_root()?;

        let mut plugins = Vec::new();

        let walker = WalkDir::new(&self.plugins_dir)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_php(entry.path()) {
                continue;
            }

            if let Some(plugin) = self.read_plugin(entry.path()) {
                debug!("Found plugin {} at {}", plugin.name, plugin.path);
                plugins.push(plugin);
            }
        }

        plugins.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.path.cmp(&b.path))
        });

        Ok(plugins)
    }

    fn check_root(&self) -> Result<(), ScanError> {
        if !self.plugins_dir.exists() {
            return Err(ScanError::NotFound(self.plugins_dir.clone()));
        }
        if !self.plugins_dir.is_dir() {
            return Err(ScanError::NotADirectory(self.plugins_dir.clone()));
        }
        std::fs::read_dir(&self.plugins_dir).map_err(|source| ScanError::Io {
            path: self.plugins_dir.clone(),
            source,
        })?;
        Ok(())
    }

    /// Build a descriptor if `path` carries a plugin header.
    fn read_plugin(&self, path: &Path) -> Option<PluginDescriptor> {
        let header = match self.read_header(path) {
            Ok(h) => h,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        let name = parse_plugin_name(&header)?;
        let relative = path.strip_prefix(&self.plugins_dir).unwrap_or(path);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Some(PluginDescriptor::new(relative, name))
    }

    fn read_header(&self, path: &Path) -> std::io::Result<String> {
        let file = File::open(path)?;
        let mut buf = Vec::with_capacity(self.config.max_header_bytes);
        file.take(self.config.max_header_bytes as u64)
            .read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Check if an entry matches exclusion patterns.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();

        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

fn is_php(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("php"))
        .unwrap_or(false)
}

/// Extract the `Plugin Name:` header value from the top of a PHP file.
pub fn parse_plugin_name(header: &str) -> Option<String> {
    const KEY: &str = "plugin name:";

    for line in header.lines() {
        let mut rest = line.trim_start();
        if let Some(stripped) = rest.strip_prefix("<?php") {
            rest = stripped;
        }
        let rest = rest.trim_start_matches([' ', '\t', '/', '*', '#', '@']);

        if rest.len() < KEY.len() || !rest.is_char_boundary(KEY.len()) {
            continue;
        }
        if !rest[..KEY.len()].eq_ignore_ascii_case(KEY) {
            continue;
        }

        let value = rest[KEY.len()..].trim();
        let value = value.strip_suffix("?>").unwrap_or(value).trim();
        let value = value.strip_suffix("*/").unwrap_or(value).trim();

        if value.is_empty() {
            return None;
        }
        return Some(value.to_string());
    }

    None
}
