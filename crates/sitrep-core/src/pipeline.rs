//! End-to-end report generation.
//!
//! Resolve window → gather concurrently → correlate → classify → build.
//! Only an invalid window aborts the run, and it does so before any gatherer
//! starts; every other failure ends up inside the report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::attention::classify;
use crate::correlate::Correlator;
use crate::domain::{resolve_at, NormalizedRecord, Result, TimeWindow};
use crate::gather::{run_all, Source, DEFAULT_SOURCE_TIMEOUT};
use crate::metrics::METRICS;
use crate::obs;
use crate::report::{Report, ReportBuilder, ReportLimits};

/// Knobs for one report run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub limits: ReportLimits,
    pub per_source_timeout: Duration,
    /// Identifier pattern for correlation; the canonical key shape when unset.
    pub id_pattern: Option<Regex>,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limits: ReportLimits::default(),
            per_source_timeout: DEFAULT_SOURCE_TIMEOUT,
            id_pattern: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Generate a report for `sources` over the window `window_expr`.
///
/// Sections follow the order of `sources`.
pub async fn generate_report(
    sources: &[Source],
    window_expr: &str,
    options: &RunOptions,
) -> Result<Report> {
    generate_report_at(sources, window_expr, options, Utc::now()).await
}

/// [`generate_report`] with an explicit "now".
pub async fn generate_report_at(
    sources: &[Source],
    window_expr: &str,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> Result<Report> {
    let window = resolve_at(window_expr, now)?;

    let run_id = Uuid::new_v4().to_string();
    let span = obs::run_span(&run_id);
    run(sources, window, options, &run_id).instrument(span).await
}

async fn run(
    sources: &[Source],
    window: TimeWindow,
    options: &RunOptions,
    run_id: &str,
) -> Result<Report> {
    let started = Instant::now();
    obs::emit_report_started(run_id, sources.len(), &window.label);

    let results = run_all(sources, &window, options.per_source_timeout, &options.cancel).await?;

    let records: Vec<NormalizedRecord> = results
        .values()
        .flat_map(|r| r.records().iter().cloned())
        .collect();

    let correlator = options
        .id_pattern
        .clone()
        .map(Correlator::new)
        .unwrap_or_default();
    let relations = correlator.correlate(&records);
    METRICS.add_relations(relations.len());

    let attention = classify(&records, &relations, &window);

    let report = ReportBuilder::new(&window, options.limits)
        .section_order(sources.iter().map(|s| s.id().to_string()))
        .relations(&relations)
        .build(&results, &attention);

    obs::emit_report_finished(
        run_id,
        started.elapsed().as_millis() as u64,
        relations.len(),
        report.attention.total,
        report.errored_sources,
    );
    METRICS.flush();

    Ok(report)
}
