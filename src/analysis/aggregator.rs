//! Plugin lookup aggregation and classification.
//!
//! This module runs one registry lookup per discovered plugin, keeps the
//! successful ones, orders them oldest first and classifies each row by
//! how long ago it was last updated.

use crate::models::{
    Classification, ClassifiedRow, LastUpdated, LookupOutcome, PluginDescriptor, Report,
    ReportMetadata, ReportRow, ReportSummary, SkipReason,
};
use crate::registry::PluginRegistry;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Default staleness threshold in days.
pub const DEFAULT_STALE_DAYS: i64 = 180;

const INDETERMINATE_INFO: &str = "Could not find last update date, possible reasons are because it is a premium plugin, custom plugin or has been removed from the WordPress Repository";

/// Settings for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum lookups in flight at once.
    pub concurrency: usize,
    /// Rows older than this many days are stale.
    pub stale_days: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            stale_days: DEFAULT_STALE_DAYS,
        }
    }
}

/// Runs lookups for a set of plugins and builds the report.
pub struct Aggregator<'a> {
    registry: &'a dyn PluginRegistry,
    config: AggregatorConfig,
    progress: Option<ProgressBar>,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a dyn PluginRegistry, config: AggregatorConfig) -> Self {
        Self {
            registry,
            config,
            progress: None,
        }
    }

    /// Tick `progress` once per finished lookup.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Look up every plugin. Outcomes come back in input order.
    pub async fn lookup_all(&self, plugins: &[PluginDescriptor]) -> Vec<LookupOutcome> {
        let concurrency = self.config.concurrency.max(1);
        let registry = self.registry;
        let progress = self.progress.as_ref();

        let lookups: Vec<_> = plugins
            .iter()
            .map(|plugin| async move {
                let outcome = lookup_plugin(registry, plugin).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                outcome
            })
            .collect();

        stream::iter(lookups).buffered(concurrency).collect().await
    }

    /// Full pipeline: lookups, then sort and classify against `now`.
    pub async fn run(
        &self,
        plugins_dir: &Path,
        plugins: &[PluginDescriptor],
        now: DateTime<Utc>,
    ) -> Report {
        let start_time = Instant::now();

        info!("Checking {} plugins", plugins.len());
        let outcomes = self.lookup_all(plugins).await;

        let skipped = count_skipped(&outcomes);
        let rows = found_rows(outcomes);
        let rows = classify_rows(sort_rows(rows), now, self.config.stale_days);
        let summary = ReportSummary::from_rows(&rows);

        info!(
            "{} plugins reported ({} stale, {} indeterminate), {} skipped",
            summary.total,
            summary.stale,
            summary.indeterminate,
            skipped.values().sum::<usize>()
        );

        let metadata = ReportMetadata {
            generated_at: now,
            plugins_dir: plugins_dir.display().to_string(),
            registry_url: self.registry.base_url().to_string(),
            stale_days: self.config.stale_days,
            plugins_discovered: plugins.len(),
            plugins_skipped: skipped.values().sum(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        };

        Report {
            metadata,
            rows,
            summary,
        }
    }
}

/// Look up a single plugin, turning every failure into a skip.
pub async fn lookup_plugin(
    registry: &dyn PluginRegistry,
    plugin: &PluginDescriptor,
) -> LookupOutcome {
    let slug = plugin.slug();
    if slug.is_empty() {
        debug!("Skipping {}: {}", plugin.path, SkipReason::EmptySlug);
        return LookupOutcome::Skipped {
            path: plugin.path.clone(),
            reason: SkipReason::EmptySlug,
        };
    }

    match registry.plugin_info(slug).await {
        Ok(payload) => {
            let last_updated = match payload.last_updated() {
                Some(raw) => LastUpdated::Known(raw),
                None => LastUpdated::Unknown,
            };
            LookupOutcome::Found(ReportRow {
                name: plugin.name.clone(),
                slug: slug.to_string(),
                last_updated,
            })
        }
        Err(e) => {
            debug!("Skipping {}: {}", plugin.path, e);
            LookupOutcome::Skipped {
                path: plugin.path.clone(),
                reason: e.skip_reason(),
            }
        }
    }
}

/// Keep only the rows of successful lookups.
pub fn found_rows(outcomes: Vec<LookupOutcome>) -> Vec<ReportRow> {
    outcomes
        .into_iter()
        .filter_map(LookupOutcome::into_row)
        .collect()
}

/// Count skipped plugins by reason.
pub fn count_skipped(outcomes: &[LookupOutcome]) -> HashMap<SkipReason, usize> {
    let mut counts: HashMap<SkipReason, usize> = HashMap::new();

    for outcome in outcomes {
        if let LookupOutcome::Skipped { reason, .. } = outcome {
            *counts.entry(*reason).or_default() += 1;
        }
    }

    counts
}

/// Sort rows oldest first.
///
/// Rows without a usable timestamp (`Unknown` or unparseable) come first.
/// The sort is stable, so ties keep their input order.
pub fn sort_rows(mut rows: Vec<ReportRow>) -> Vec<ReportRow> {
    rows.sort_by_cached_key(|row| row.last_updated.timestamp());
    rows
}

/// Classify one row against `now`.
pub fn classify(last_updated: &LastUpdated, now: DateTime<Utc>, stale_days: i64) -> Classification {
    if last_updated.is_unknown() {
        return Classification::Indeterminate;
    }

    // Unparseable dates count as infinitely old.
    let Some(at) = last_updated.timestamp() else {
        return Classification::Stale;
    };

    // A threshold too large for chrono never expires.
    match Duration::try_days(stale_days.max(0)) {
        Some(threshold) if now.signed_duration_since(at) > threshold => Classification::Stale,
        _ => Classification::Current,
    }
}

/// Explanatory text shown next to a classified row.
pub fn information_text(classification: Classification, stale_days: i64) -> String {
    match classification {
        Classification::Current => String::new(),
        Classification::Indeterminate => INDETERMINATE_INFO.to_string(),
        Classification::Stale if stale_days == DEFAULT_STALE_DAYS => {
            "Not updated in last 6 months!".to_string()
        }
        Classification::Stale => format!("Not updated in last {} days!", stale_days),
    }
}

/// Classify rows, keeping their order.
pub fn classify_rows(rows: Vec<ReportRow>, now: DateTime<Utc>, stale_days: i64) -> Vec<ClassifiedRow> {
    rows.into_iter()
        .map(|row| {
            let classification = classify(&row.last_updated, now, stale_days);
            let updated_at = row.last_updated.timestamp();
            let age_days = updated_at.map(|at| now.signed_duration_since(at).num_days());

            ClassifiedRow {
                information: information_text(classification, stale_days),
                row,
                classification,
                updated_at,
                age_days,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StaticRegistry;
    use chrono::TimeZone;
    use serde_json::json;
    use std::path::PathBuf;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn row(name: &str, last_updated: LastUpdated) -> ReportRow {
        ReportRow {
            name: name.to_string(),
            slug: name.to_lowercase(),
            last_updated,
        }
    }

    fn known(raw: &str) -> LastUpdated {
        LastUpdated::Known(raw.to_string())
    }

    async fn run(registry: &StaticRegistry, plugins: &[PluginDescriptor], now: DateTime<Utc>) -> Report {
        Aggregator::new(registry, AggregatorConfig::default())
            .run(&PathBuf::from("/srv/wp-content/plugins"), plugins, now)
            .await
    }

    #[tokio::test]
    async fn test_stale_and_current_plugins() {
        let registry = StaticRegistry::new()
            .with_date("a", "2020-01-01")
            .with_date("b", "2024-06-01");
        let plugins = vec![
            PluginDescriptor::new("b/b.php", "B"),
            PluginDescriptor::new("a/a.php", "A"),
        ];

        let report = run(&registry, &plugins, at(2024, 7, 1)).await;

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].row.name, "A");
        assert_eq!(report.rows[0].classification, Classification::Stale);
        assert_eq!(report.rows[0].information, "Not updated in last 6 months!");
        assert_eq!(report.rows[1].row.name, "B");
        assert_eq!(report.rows[1].classification, Classification::Current);
        assert!(report.rows[1].information.is_empty());
        assert_eq!(report.rows[1].age_days, Some(30));
    }

    #[tokio::test]
    async fn test_empty_slug_is_skipped_without_lookup() {
        let registry = StaticRegistry::new();
        let plugins = vec![PluginDescriptor::new("hello.php", "C")];

        let report = run(&registry, &plugins, at(2024, 7, 1)).await;

        assert!(report.rows.is_empty());
        assert_eq!(report.metadata.plugins_discovered, 1);
        assert_eq!(report.metadata.plugins_skipped, 1);
        assert!(registry.requested().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_skipped() {
        let registry = StaticRegistry::new().with_failure("d", SkipReason::Transport);
        let plugins = vec![PluginDescriptor::new("d/d.php", "D")];

        let report = run(&registry, &plugins, at(2024, 7, 1)).await;

        assert!(report.rows.is_empty());
        assert_eq!(registry.requested(), vec!["d"]);
    }

    #[tokio::test]
    async fn test_missing_last_updated_is_indeterminate() {
        let registry = StaticRegistry::new().with_json("e", json!({"name": "E"}));
        let plugins = vec![PluginDescriptor::new("e/e.php", "E")];

        let report = run(&registry, &plugins, at(2024, 7, 1)).await;

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].row.last_updated, LastUpdated::Unknown);
        assert_eq!(report.rows[0].classification, Classification::Indeterminate);
        assert!(report.rows[0].information.contains("premium plugin"));
        assert_eq!(report.summary.indeterminate, 1);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_payloads_are_skipped() {
        let registry = StaticRegistry::new()
            .with_json("null", json!(null))
            .with_json("list", json!([]))
            .with_failure("garbled", SkipReason::InvalidJson)
            .with_failure("missing", SkipReason::HttpStatus(404))
            .with_date("ok", "2024-06-20");
        let plugins = vec![
            PluginDescriptor::new("null/null.php", "Null"),
            PluginDescriptor::new("list/list.php", "List"),
            PluginDescriptor::new("garbled/garbled.php", "Garbled"),
            PluginDescriptor::new("missing/missing.php", "Missing"),
            PluginDescriptor::new("ok/ok.php", "Ok"),
        ];

        let registry_ref: &dyn PluginRegistry = &registry;
        let outcomes = Aggregator::new(registry_ref, AggregatorConfig::default())
            .lookup_all(&plugins)
            .await;
        let skipped = count_skipped(&outcomes);
        assert_eq!(skipped.get(&SkipReason::EmptyBody), Some(&2));
        assert_eq!(skipped.get(&SkipReason::InvalidJson), Some(&1));
        assert_eq!(skipped.get(&SkipReason::HttpStatus(404)), Some(&1));

        let rows = found_rows(outcomes);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ok");
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order_with_concurrency() {
        let mut registry = StaticRegistry::new();
        let mut plugins = Vec::new();
        for i in 0..20 {
            let slug = format!("p{:02}", i);
            registry = registry.with_date(&slug, "2024-01-01");
            plugins.push(PluginDescriptor::new(format!("{}/{}.php", slug, slug), slug));
        }

        let config = AggregatorConfig {
            concurrency: 8,
            ..AggregatorConfig::default()
        };
        let outcomes = Aggregator::new(&registry, config).lookup_all(&plugins).await;

        let names: Vec<_> = found_rows(outcomes).into_iter().map(|r| r.name).collect();
        let expected: Vec<_> = plugins.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let registry = StaticRegistry::new()
            .with_date("a", "2020-01-01")
            .with_json("b", json!({}))
            .with_date("c", "2024-06-01");
        let plugins = vec![
            PluginDescriptor::new("a/a.php", "A"),
            PluginDescriptor::new("b/b.php", "B"),
            PluginDescriptor::new("c/c.php", "C"),
        ];
        let now = at(2024, 7, 1);

        let first = run(&registry, &plugins, now).await;
        let second = run(&registry, &plugins, now).await;

        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_lookup_plugin_maps_payload() {
        let registry = StaticRegistry::new()
            .with_date("akismet", "2024-06-01 3:45pm GMT")
            .with_json("custom", json!({"error": "Plugin not found."}));

        let found = tokio_test::block_on(lookup_plugin(
            &registry,
            &PluginDescriptor::new("akismet/akismet.php", "Akismet"),
        ));
        assert_eq!(
            found,
            LookupOutcome::Found(ReportRow {
                name: "Akismet".to_string(),
                slug: "akismet".to_string(),
                last_updated: known("2024-06-01 3:45pm GMT"),
            })
        );

        let unknown = tokio_test::block_on(lookup_plugin(
            &registry,
            &PluginDescriptor::new("custom/custom.php", "Custom"),
        ));
        assert_eq!(
            unknown.into_row().map(|r| r.last_updated),
            Some(LastUpdated::Unknown)
        );
    }

    #[test]
    fn test_sort_unknown_first_then_oldest() {
        let rows = vec![
            row("New", known("2024-06-01 3:45pm GMT")),
            row("Mystery", LastUpdated::Unknown),
            row("Old", known("2019-03-10 1:00am GMT")),
            row("Garbage", known("sometime")),
            row("Middle", known("2022-08-15")),
        ];

        let names: Vec<_> = sort_rows(rows).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Mystery", "Garbage", "Old", "Middle", "New"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_dates() {
        let rows = vec![
            row("First", known("2023-01-01")),
            row("Second", known("2023-01-01 12:00am GMT")),
            row("Third", known("2023-01-01")),
        ];

        let names: Vec<_> = sort_rows(rows).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_sorted_rows_are_non_decreasing() {
        let rows = vec![
            row("a", known("2021-05-01")),
            row("b", known("2018-01-01")),
            row("c", known("2024-02-29 11:59pm GMT")),
            row("d", known("2021-05-01 6:00pm GMT")),
            row("e", LastUpdated::Unknown),
        ];

        let stamps: Vec<_> = sort_rows(rows)
            .iter()
            .filter_map(|r| r.last_updated.timestamp())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_classify_threshold_boundary() {
        let now = at(2024, 7, 1);
        let exactly = (now - Duration::days(180)).format("%Y-%m-%d %H:%M:%S").to_string();
        let just_over = (now - Duration::days(180) - Duration::minutes(1))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        assert_eq!(classify(&known(&exactly), now, 180), Classification::Current);
        assert_eq!(classify(&known(&just_over), now, 180), Classification::Stale);
    }

    #[test]
    fn test_classify_unknown_and_unparseable() {
        let now = at(2024, 7, 1);
        assert_eq!(
            classify(&LastUpdated::Unknown, now, 180),
            Classification::Indeterminate
        );
        assert_eq!(classify(&known("not a date"), now, 180), Classification::Stale);
    }

    #[test]
    fn test_classify_out_of_range_threshold() {
        let now = at(2024, 7, 1);
        assert_eq!(
            classify(&known("2020-01-01"), now, 200_000_000_000_000),
            Classification::Current
        );
        assert_eq!(classify(&known("2020-01-01"), now, i64::MAX), Classification::Current);
        assert_eq!(classify(&known("not a date"), now, i64::MAX), Classification::Stale);
    }

    #[test]
    fn test_classify_negative_threshold_acts_as_zero() {
        let now = at(2024, 7, 1);
        assert_eq!(classify(&known("2024-07-01"), now, -5), Classification::Current);
        assert_eq!(classify(&known("2024-06-30"), now, -5), Classification::Stale);
    }

    #[test]
    fn test_run_future_is_send() {
        fn require_send<F: std::future::Future + Send>(future: F) -> F {
            future
        }

        let registry = StaticRegistry::new().with_date("a", "2024-06-01");
        let plugins = vec![PluginDescriptor::new("a/a.php", "A")];
        let aggregator = Aggregator::new(&registry, AggregatorConfig::default());

        let report = tokio_test::block_on(require_send(aggregator.run(
            Path::new("/srv/wp-content/plugins"),
            &plugins,
            at(2024, 7, 1),
        )));
        assert_eq!(report.rows.len(), 1);
    }

    #[test]
    fn test_classify_future_date_is_current() {
        let now = at(2024, 7, 1);
        assert_eq!(classify(&known("2025-01-01"), now, 180), Classification::Current);
    }

    #[test]
    fn test_custom_threshold_information() {
        assert_eq!(
            information_text(Classification::Stale, 90),
            "Not updated in last 90 days!"
        );
        assert_eq!(
            information_text(Classification::Stale, DEFAULT_STALE_DAYS),
            "Not updated in last 6 months!"
        );
        assert!(information_text(Classification::Current, 90).is_empty());
    }
}
