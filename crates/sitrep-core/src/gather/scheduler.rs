//! Concurrent gatherer scheduling.
//!
//! [`run_all`] fans out one task per source and fans back in once every task
//! finished, timed out or was cancelled. The fan-in itself is bounded by the
//! per-source timeout, so the whole run takes at most
//! `per_source_timeout + FAN_IN_GRACE` regardless of how many sources exist.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use crate::domain::{GatherResult, SitrepError, TimeWindow};
use crate::gather::Source;
use crate::metrics::METRICS;
use crate::obs;

/// Per-source timeout used when the caller does not configure one.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Message recorded for sources interrupted by cancellation.
pub const CANCELLED: &str = "cancelled";

/// Slack between the per-source deadline and the fan-in ceiling.
const FAN_IN_GRACE: Duration = Duration::from_millis(250);

/// One result per requested source, keyed by source id.
pub type GatherResults = BTreeMap<String, GatherResult>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run every source concurrently and collect exactly one result per source.
///
/// Completion order does not matter: results are keyed by source id. A slow
/// source becomes `Error{"timed out"}` without delaying the others; a
/// cancelled run records `Error{"cancelled"}` for sources still in flight.
///
/// Fails only when two sources share an id.
pub async fn run_all(
    sources: &[Source],
    window: &TimeWindow,
    per_source_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<GatherResults, SitrepError> {
    let mut ids = BTreeSet::new();
    for source in sources {
        if !ids.insert(source.id().to_string()) {
            return Err(SitrepError::DuplicateSource(source.id().to_string()));
        }
    }

    let mut join_set = JoinSet::new();
    for source in sources {
        let gatherer = Arc::clone(&source.gatherer);
        let config = source.config.clone();
        let window = window.clone();
        let cancel = cancel.clone();

        join_set.spawn(async move {
            let started = Instant::now();
            let fetch = AssertUnwindSafe(gatherer.fetch(&window, &config)).catch_unwind();

            let result = tokio::select! {
                _ = cancel.cancelled() => GatherResult::error(CANCELLED),
                outcome = tokio::time::timeout(per_source_timeout, fetch) => match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(payload)) => GatherResult::error(format!(
                        "gatherer panicked: {}",
                        panic_message(payload.as_ref())
                    )),
                    Err(_) => GatherResult::timed_out(),
                },
            };

            obs::emit_source_finished(
                &config.source_id,
                gatherer.kind(),
                &result,
                started.elapsed().as_millis() as u64,
            );
            (config.source_id, result)
        }
        .instrument(tracing::Span::current()));
    }

    let deadline = Instant::now() + per_source_timeout + FAN_IN_GRACE;
    let mut results = GatherResults::new();
    let mut ceiling_hit = false;

    loop {
        match tokio::time::timeout_at(deadline, join_set.join_next()).await {
            Ok(Some(Ok((id, result)))) => {
                debug!(source = %id, status = result.status_label(), "source collected");
                results.insert(id, result);
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, "gatherer task failed to join");
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    pending = join_set.len(),
                    "fan-in ceiling reached, aborting remaining gatherers"
                );
                join_set.abort_all();
                ceiling_hit = true;
                break;
            }
        }
    }

    // Every requested source gets an entry, even if its task vanished.
    for id in ids {
        results.entry(id).or_insert_with(|| {
            if ceiling_hit {
                GatherResult::timed_out()
            } else if cancel.is_cancelled() {
                GatherResult::error(CANCELLED)
            } else {
                GatherResult::error("gatherer task aborted")
            }
        });
    }

    for (id, result) in &results {
        METRICS.record_source(result);
        if result.is_timed_out() {
            obs::emit_source_timed_out(id, per_source_timeout.as_millis() as u64);
        }
    }

    Ok(results)
}
