//! Structured observability hooks for report runs.
//!
//! This module provides:
//! - A run-scoped tracing span carrying the run id
//! - Emission functions for lifecycle events: start, per-source finish,
//!   per-source timeout, finish
//!
//! Filtering follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

use crate::domain::GatherResult;

/// Run-scoped span; attach it to the run future with
/// [`tracing::Instrument::instrument`].
///
/// ```ignore
/// async { /* every event carries run_id */ }.instrument(run_span(&run_id)).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("sitrep.run", run_id = %run_id)
}

/// Emit event: report run started.
pub fn emit_report_started(run_id: &str, source_count: usize, window_label: &str) {
    info!(
        event = "report.started",
        run_id = %run_id,
        sources = source_count,
        window = %window_label,
    );
}

/// Emit event: one source finished (any outcome).
pub fn emit_source_finished(source_id: &str, kind: &str, result: &GatherResult, duration_ms: u64) {
    info!(
        event = "source.finished",
        source = %source_id,
        kind = %kind,
        status = result.status_label(),
        records = result.records().len(),
        duration_ms = duration_ms,
    );
}

/// Emit event: a source exceeded its timeout (warning level).
pub fn emit_source_timed_out(source_id: &str, timeout_ms: u64) {
    warn!(event = "source.timed_out", source = %source_id, timeout_ms = timeout_ms);
}

/// Emit event: report assembled.
pub fn emit_report_finished(
    run_id: &str,
    duration_ms: u64,
    relations: usize,
    attention: usize,
    errored_sources: usize,
) {
    info!(
        event = "report.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        relations = relations,
        attention = attention,
        errored_sources = errored_sources,
    );
}
