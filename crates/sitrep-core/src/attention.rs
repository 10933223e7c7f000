//! Attention classification.
//!
//! Each open record is scored independently against a fixed rubric; the
//! first matching rule wins:
//!
//! | Condition | Severity |
//! |---|---|
//! | checks failing and untouched for more than 2× the window | severe |
//! | review blocked and no activity inside the window | moderate |
//! | unassigned and urgent priority | moderate |
//! | no activity for more than 2× the window | minor |
//!
//! Relations never raise severity; they only add a `(linked: ...)` hint to
//! the reason. Ages are measured from `window.until`, so the output depends
//! only on the inputs.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::correlate::RelationGraph;
use crate::domain::{
    AttentionItem, CheckState, NormalizedRecord, Priority, Relation, Severity, TimeWindow,
};

/// Classify `records` and return attention items, highest priority first.
///
/// Not truncated; the report builder applies limits.
pub fn classify(
    records: &[NormalizedRecord],
    relations: &[Relation],
    window: &TimeWindow,
) -> Vec<AttentionItem> {
    let graph = RelationGraph::build(relations);

    let mut items: Vec<AttentionItem> = records
        .iter()
        .filter(|r| !r.is_terminal())
        .filter_map(|record| {
            let (severity, reason) = evaluate(record, window)?;
            let record_ref = record.record_ref();
            let related = graph.first_neighbour(&record_ref).cloned();
            let reason = match &related {
                Some(other) => format!("{reason} (linked: {other})"),
                None => reason,
            };
            Some(AttentionItem {
                record: record_ref,
                severity,
                reason,
                updated_at: record.updated_at,
                related,
            })
        })
        .collect();

    items.sort_by(attention_order);
    items
}

/// Severity desc, then `updated_at` desc, then identifier asc, then source asc.
pub fn attention_order(a: &AttentionItem, b: &AttentionItem) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.record.identifier.cmp(&b.record.identifier))
        .then_with(|| a.record.source_id.cmp(&b.record.source_id))
}

fn evaluate(record: &NormalizedRecord, window: &TimeWindow) -> Option<(Severity, String)> {
    let signals = &record.signals;
    let stale = window.is_stale(record.updated_at);

    if signals.checks == Some(CheckState::Failing) && stale {
        return Some((
            Severity::Severe,
            format!(
                "CI failing and untouched for {}",
                describe_age(window.until, record.updated_at)
            ),
        ));
    }

    if let Some(review) = signals.review {
        if review.is_blocked() && !window.is_within(record.updated_at) {
            return Some((
                Severity::Moderate,
                format!("review blocked with no activity in the {}", window.label),
            ));
        }
    }

    if signals.assignee.is_none() && signals.priority == Some(Priority::Urgent) {
        return Some((Severity::Moderate, "unassigned urgent item".to_string()));
    }

    if stale {
        return Some((
            Severity::Minor,
            format!(
                "no activity for {}",
                describe_age(window.until, record.updated_at)
            ),
        ));
    }

    None
}

/// Coarse human age: whole days when at least one day, otherwise hours.
fn describe_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let age = now - then;
    match age.num_days() {
        d if d >= 1 => format!("{d}d"),
        _ => format!("{}h", age.num_hours().max(0)),
    }
}
