//! Bounded report assembly.
//!
//! Section order is fixed: attention first, then one section per source in
//! the configured order, then notes for every source that did not fully
//! succeed. Every list is re-sorted here, so the report does not depend on
//! the order sources finished in.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlate::RelationGraph;
use crate::domain::digest::compute_digest;
use crate::domain::{
    AttentionItem, GatherResult, NormalizedRecord, RecordKind, RecordRef, Relation, Result,
    Severity, TimeWindow,
};
use crate::gather::GatherResults;

pub mod render;

/// Note shown when no source produced records.
pub const NO_SOURCES_AVAILABLE: &str = "no sources available";

/// Size limits applied when building a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    pub max_attention: usize,
    pub max_per_section: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_attention: 10,
            max_per_section: 15,
        }
    }
}

/// Per-source status as shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Success,
    PartialSuccess,
    Unavailable,
    Error,
}

impl From<&GatherResult> for SourceStatus {
    fn from(result: &GatherResult) -> Self {
        match result {
            GatherResult::Success { .. } => Self::Success,
            GatherResult::PartialSuccess { .. } => Self::PartialSuccess,
            GatherResult::Unavailable { .. } => Self::Unavailable,
            GatherResult::Error { .. } => Self::Error,
        }
    }
}

/// Attention item enriched with the record's title and url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionEntry {
    pub record: RecordRef,
    pub severity: Severity,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionSection {
    pub items: Vec<AttentionEntry>,
    /// Items before truncation.
    pub total: usize,
    pub omitted: usize,
    /// Sources that ended in `Error`, timeouts included. Never truncated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<SourceNote>,
}

/// One record line in a source section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub identifier: String,
    pub kind: RecordKind,
    pub title: String,
    pub state: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Related records in other sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<RecordRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSection {
    pub source_id: String,
    pub status: SourceStatus,
    pub records: Vec<ReportRecord>,
    pub shown: usize,
    pub total: usize,
    /// `showing N of M` when records were cut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Trailing note for a source that did not fully succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNote {
    pub source_id: String,
    pub status: SourceStatus,
    pub detail: String,
}

/// Structured, unrendered report. Rendering lives in [`render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub window_label: String,
    pub generated_at: DateTime<Utc>,
    pub attention: AttentionSection,
    pub sections: Vec<SourceSection>,
    pub notes: Vec<SourceNote>,
    pub no_sources_available: bool,
    /// Sources that ended in `Error` (timeouts included).
    pub errored_sources: usize,
}

impl Report {
    /// SHA-256 over the canonical JSON form; equal reports share a fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        compute_digest(self)
    }

    pub fn has_attention(&self) -> bool {
        !self.attention.items.is_empty() || !self.attention.failed_sources.is_empty()
    }
}

/// Builds a [`Report`] from collected results and classified items.
#[derive(Debug, Clone)]
pub struct ReportBuilder<'a> {
    window: &'a TimeWindow,
    limits: ReportLimits,
    section_order: Vec<String>,
    relations: &'a [Relation],
}

impl<'a> ReportBuilder<'a> {
    pub fn new(window: &'a TimeWindow, limits: ReportLimits) -> Self {
        Self {
            window,
            limits,
            section_order: Vec::new(),
            relations: &[],
        }
    }

    /// Sources listed here come first, in this order; the rest follow by id.
    pub fn section_order(mut self, order: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.section_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Relations used to annotate section records with links.
    pub fn relations(mut self, relations: &'a [Relation]) -> Self {
        self.relations = relations;
        self
    }

    pub fn build(&self, results: &GatherResults, attention: &[AttentionItem]) -> Report {
        let order = self.ordered_ids(results);
        let graph = RelationGraph::build(self.relations);

        let by_ref: HashMap<RecordRef, &NormalizedRecord> = results
            .values()
            .flat_map(GatherResult::records)
            .map(|r| (r.record_ref(), r))
            .collect();

        let mut sections = Vec::new();
        let mut notes = Vec::new();
        for id in &order {
            let Some(result) = results.get(id.as_str()) else {
                continue;
            };
            if result.has_records() {
                sections.push(self.section(id, result, &graph));
            }
            if let Some(detail) = result.detail() {
                notes.push(SourceNote {
                    source_id: id.clone(),
                    status: result.into(),
                    detail: detail.to_string(),
                });
            }
        }

        let failed_sources: Vec<SourceNote> = notes
            .iter()
            .filter(|n| n.status == SourceStatus::Error)
            .cloned()
            .collect();

        let mut attention = self.attention(attention, &by_ref);
        attention.failed_sources = failed_sources;

        Report {
            window_label: self.window.label.clone(),
            generated_at: self.window.until,
            errored_sources: attention.failed_sources.len(),
            attention,
            sections,
            notes,
            no_sources_available: !results.values().any(GatherResult::has_records),
        }
    }

    fn ordered_ids(&self, results: &GatherResults) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        for id in &self.section_order {
            if results.contains_key(id.as_str()) && seen.insert(id.clone()) {
                order.push(id.clone());
            }
        }
        order.extend(results.keys().filter(|id| !seen.contains(*id)).cloned());
        order
    }

    fn attention(
        &self,
        items: &[AttentionItem],
        by_ref: &HashMap<RecordRef, &NormalizedRecord>,
    ) -> AttentionSection {
        let mut sorted = items.to_vec();
        sorted.sort_by(crate::attention::attention_order);

        let total = sorted.len();
        let items: Vec<AttentionEntry> = sorted
            .into_iter()
            .take(self.limits.max_attention)
            .map(|item| {
                let record = by_ref.get(&item.record);
                AttentionEntry {
                    title: record.map(|r| r.title.clone()),
                    url: record.and_then(|r| r.url.clone()),
                    record: item.record,
                    severity: item.severity,
                    reason: item.reason,
                    updated_at: item.updated_at,
                }
            })
            .collect();

        AttentionSection {
            omitted: total - items.len(),
            total,
            items,
            failed_sources: Vec::new(),
        }
    }

    fn section(&self, id: &str, result: &GatherResult, graph: &RelationGraph) -> SourceSection {
        let mut records: Vec<&NormalizedRecord> = result.records().iter().collect();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        let total = records.len();
        let shown = total.min(self.limits.max_per_section);
        let records: Vec<ReportRecord> = records
            .into_iter()
            .take(shown)
            .map(|r| ReportRecord {
                identifier: r.identifier.clone(),
                kind: r.kind,
                title: r.title.clone(),
                state: r.state.clone(),
                updated_at: r.updated_at,
                url: r.url.clone(),
                links: graph.neighbours(&r.record_ref()).cloned().collect(),
            })
            .collect();

        let warning = match result {
            GatherResult::PartialSuccess { warning, .. } => Some(warning.clone()),
            _ => None,
        };

        SourceSection {
            source_id: id.to_string(),
            status: result.into(),
            records,
            shown,
            total,
            truncation: (shown < total).then(|| format!("showing {shown} of {total}")),
            warning,
        }
    }
}

/// Build a report with sections ordered by source id and no link annotations.
pub fn build(
    results: &GatherResults,
    attention: &[AttentionItem],
    window: &TimeWindow,
    limits: ReportLimits,
) -> Report {
    ReportBuilder::new(window, limits).build(results, attention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{resolve_at, RecordSignals};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        resolve_at("24h", now()).unwrap()
    }

    fn rec(source: &str, id: &str, age_hours: i64) -> NormalizedRecord {
        NormalizedRecord::new(
            source,
            RecordKind::Issue,
            id,
            format!("title {id}"),
            "open",
            now() - Duration::hours(age_hours),
        )
        .with_signals(RecordSignals::default())
    }

    fn item(source: &str, id: &str, severity: Severity, age_hours: i64) -> AttentionItem {
        AttentionItem {
            record: RecordRef::new(source, id),
            severity,
            reason: "because".to_string(),
            updated_at: now() - Duration::hours(age_hours),
            related: None,
        }
    }

    #[test]
    fn test_all_unavailable_reports_no_sources() {
        let mut results = GatherResults::new();
        results.insert("gh".to_string(), GatherResult::unavailable("gh not installed"));
        results.insert("linear".to_string(), GatherResult::unavailable("no api key"));

        let report = build(&results, &[], &window(), ReportLimits::default());
        assert!(report.no_sources_available);
        assert!(report.attention.items.is_empty());
        assert!(report.sections.is_empty());
        assert_eq!(report.notes.len(), 2);
        assert_eq!(report.errored_sources, 0);
    }

    #[test]
    fn test_errored_sources_need_attention() {
        let mut results = GatherResults::new();
        results.insert("gh".to_string(), GatherResult::unavailable("gh not installed"));
        results.insert("linear".to_string(), GatherResult::error("linear rejected credentials"));
        results.insert("bd".to_string(), GatherResult::timed_out());

        let report = build(&results, &[], &window(), ReportLimits::default());
        assert!(report.no_sources_available);
        assert!(report.has_attention());
        assert_eq!(report.attention.total, 0);
        assert_eq!(report.errored_sources, 2);

        let failed: Vec<_> = report
            .attention
            .failed_sources
            .iter()
            .map(|n| (n.source_id.as_str(), n.detail.as_str()))
            .collect();
        assert_eq!(
            failed,
            vec![("bd", "timed out"), ("linear", "linear rejected credentials")]
        );
    }

    #[test]
    fn test_empty_results_still_build() {
        let report = build(&GatherResults::new(), &[], &window(), ReportLimits::default());
        assert!(report.no_sources_available);
        assert_eq!(report.window_label, "last 24 hours");
        assert_eq!(report.generated_at, now());
    }

    #[test]
    fn test_section_truncation_annotated() {
        let mut results = GatherResults::new();
        results.insert(
            "bd".to_string(),
            GatherResult::Success {
                records: (0..5).map(|i| rec("bd", &format!("bd-{i}"), i)).collect(),
            },
        );
        let limits = ReportLimits {
            max_attention: 10,
            max_per_section: 2,
        };

        let report = build(&results, &[], &window(), limits);
        let section = &report.sections[0];
        assert_eq!(section.shown, 2);
        assert_eq!(section.total, 5);
        assert_eq!(section.truncation.as_deref(), Some("showing 2 of 5"));
        assert_eq!(section.records[0].identifier, "bd-0");
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_attention_truncated_with_omitted_count() {
        let mut results = GatherResults::new();
        results.insert(
            "gh".to_string(),
            GatherResult::Success {
                records: vec![rec("gh", "1", 100)],
            },
        );
        let items = vec![
            item("gh", "3", Severity::Minor, 100),
            item("gh", "1", Severity::Severe, 100),
            item("gh", "2", Severity::Moderate, 100),
        ];
        let limits = ReportLimits {
            max_attention: 2,
            max_per_section: 10,
        };

        let report = build(&results, &items, &window(), limits);
        assert_eq!(report.attention.total, 3);
        assert_eq!(report.attention.omitted, 1);
        assert_eq!(report.attention.items[0].record.identifier, "1");
        assert_eq!(report.attention.items[0].title.as_deref(), Some("title 1"));
        assert_eq!(report.attention.items[1].severity, Severity::Moderate);
        assert_eq!(report.attention.items[1].title, None);
    }

    #[test]
    fn test_configured_order_then_alphabetical() {
        let mut results = GatherResults::new();
        for id in ["alpha", "beta", "gamma"] {
            results.insert(id.to_string(), GatherResult::Success { records: vec![] });
        }
        let w = window();
        let report = ReportBuilder::new(&w, ReportLimits::default())
            .section_order(["gamma", "missing"])
            .build(&results, &[]);

        let ids: Vec<_> = report.sections.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_non_success_sources_noted() {
        let mut results = GatherResults::new();
        results.insert(
            "gh".to_string(),
            GatherResult::PartialSuccess {
                records: vec![rec("gh", "1", 1)],
                warning: "page cap of 1 reached".to_string(),
            },
        );
        results.insert("linear".to_string(), GatherResult::timed_out());

        let report = build(&results, &[], &window(), ReportLimits::default());
        assert!(!report.no_sources_available);
        assert_eq!(report.errored_sources, 1);
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].status, SourceStatus::PartialSuccess);
        assert!(report.sections[0].warning.is_some());
        assert_eq!(
            report.notes,
            vec![
                SourceNote {
                    source_id: "gh".to_string(),
                    status: SourceStatus::PartialSuccess,
                    detail: "page cap of 1 reached".to_string(),
                },
                SourceNote {
                    source_id: "linear".to_string(),
                    status: SourceStatus::Error,
                    detail: "timed out".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_links_annotated_from_relations() {
        let mut results = GatherResults::new();
        results.insert(
            "gh".to_string(),
            GatherResult::Success {
                records: vec![rec("gh", "1", 1)],
            },
        );
        let relations = vec![Relation::new(
            RecordRef::new("gh", "1"),
            RecordRef::new("linear", "PROJ-1"),
            crate::domain::RelationBasis::IdentifierMatch,
        )];
        let w = window();
        let report = ReportBuilder::new(&w, ReportLimits::default())
            .relations(&relations)
            .build(&results, &[]);
        assert_eq!(
            report.sections[0].records[0].links,
            vec![RecordRef::new("linear", "PROJ-1")]
        );
    }

    #[test]
    fn test_fingerprint_stable_for_identical_input() {
        let mut results = GatherResults::new();
        results.insert(
            "gh".to_string(),
            GatherResult::Success {
                records: vec![rec("gh", "1", 1), rec("gh", "2", 2)],
            },
        );
        let a = build(&results, &[], &window(), ReportLimits::default());
        let b = build(&results, &[], &window(), ReportLimits::default());
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
