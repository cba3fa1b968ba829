//! Data models for the plugin checker.
//!
//! This module contains the core data structures used throughout
//! the application for representing installed plugins, lookup
//! outcomes, classified report rows, and the report itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel shown when the registry does not report a last-updated date.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// A plugin discovered in the local plugins directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin file path relative to the plugins directory
    /// (e.g. `akismet/akismet.php` or `hello.php`).
    pub path: String,
    /// Display name taken from the `Plugin Name:` header.
    pub name: String,
}

impl PluginDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Registry slug: the directory the plugin file lives in.
    ///
    /// Single-file plugins at the root of the plugins directory have no
    /// directory component and yield an empty slug.
    pub fn slug(&self) -> &str {
        let path = self.path.trim_end_matches('/');
        match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        }
    }
}

/// Last-updated value reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum LastUpdated {
    /// Raw date string as returned by the registry.
    Known(String),
    /// The registry answered but carried no date.
    Unknown,
}

impl LastUpdated {
    pub fn is_unknown(&self) -> bool {
        matches!(self, LastUpdated::Unknown)
    }

    /// Parse the value into a point in time.
    ///
    /// Returns `None` for `Unknown` and for strings no supported format matches.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            LastUpdated::Known(raw) => crate::analysis::parse_last_updated(raw),
            LastUpdated::Unknown => None,
        }
    }
}

impl fmt::Display for LastUpdated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdated::Known(raw) => write!(f, "{}", raw),
            LastUpdated::Unknown => write!(f, "{}", UNKNOWN_SENTINEL),
        }
    }
}

/// One plugin that was successfully looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Plugin display name (never empty).
    pub name: String,
    /// Registry slug used for the lookup.
    pub slug: String,
    /// Last-updated value from the registry.
    pub last_updated: LastUpdated,
}

/// Why a plugin was left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "status")]
pub enum SkipReason {
    /// No slug could be derived from the plugin path.
    EmptySlug,
    /// The request never produced a response (connect error, timeout, ...).
    Transport,
    /// The registry answered with a non-success status.
    HttpStatus(u16),
    /// The body was empty or decoded to an empty value.
    EmptyBody,
    /// The body was not valid JSON.
    InvalidJson,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptySlug => write!(f, "empty slug"),
            SkipReason::Transport => write!(f, "transport error"),
            SkipReason::HttpStatus(code) => write!(f, "HTTP status {}", code),
            SkipReason::EmptyBody => write!(f, "empty response"),
            SkipReason::InvalidJson => write!(f, "invalid JSON"),
        }
    }
}

/// Result of processing a single plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(ReportRow),
    Skipped {
        /// Plugin path the skip applies to.
        path: String,
        reason: SkipReason,
    },
}

impl LookupOutcome {
    pub fn into_row(self) -> Option<ReportRow> {
        match self {
            LookupOutcome::Found(row) => Some(row),
            LookupOutcome::Skipped { .. } => None,
        }
    }
}

/// Staleness classification of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Updated within the staleness window.
    Current,
    /// Not updated within the staleness window.
    Stale,
    /// No last-updated date available.
    Indeterminate,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Classification {
    /// Lowercase name, used as CSS class and `data-status` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Current => "current",
            Classification::Stale => "stale",
            Classification::Indeterminate => "indeterminate",
        }
    }

    /// Returns an emoji marker for text reports.
    pub fn emoji(&self) -> &'static str {
        match self {
            Classification::Current => "🟢",
            Classification::Stale => "🔴",
            Classification::Indeterminate => "🟡",
        }
    }
}

/// A report row together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    #[serde(flatten)]
    pub row: ReportRow,
    pub classification: Classification,
    /// Explanatory text; empty for current plugins.
    pub information: String,
    /// Parsed last-updated time, if the value could be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Whole days between `updated_at` and report generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
}

/// Counts per classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub current: usize,
    pub stale: usize,
    pub indeterminate: usize,
}

impl ReportSummary {
    /// Creates a summary from classified rows.
    pub fn from_rows(rows: &[ClassifiedRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };

        for row in rows {
            match row.classification {
                Classification::Current => summary.current += 1,
                Classification::Stale => summary.stale += 1,
                Classification::Indeterminate => summary.indeterminate += 1,
            }
        }

        summary
    }
}

/// Metadata about a report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Instant the rows were classified against.
    pub generated_at: DateTime<Utc>,
    /// Plugins directory that was scanned.
    pub plugins_dir: String,
    /// Registry base URL.
    pub registry_url: String,
    /// Staleness threshold in days.
    pub stale_days: i64,
    /// Plugins found in the plugins directory.
    pub plugins_discovered: usize,
    /// Plugins left out of the report.
    pub plugins_skipped: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete plugin report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Rows in report order (oldest first).
    pub rows: Vec<ClassifiedRow>,
    pub summary: ReportSummary,
}

impl Report {
    /// Returns true if any row is classified as stale.
    pub fn has_stale(&self) -> bool {
        self.summary.stale > 0
    }
}
