//! Cross-source correlation.
//!
//! Scans every record's free text for tracked-issue keys and links the
//! record to any other record carrying that key as its identifier. Stack
//! branches additionally get a case-insensitive slug match against tracked
//! issues (`proj-42-fix-login` → `PROJ-42`), recorded as `BranchMatch`.
//!
//! The identifier index is built once; each text is scanned once. Output is
//! sorted and deduplicated so it does not depend on input order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{NormalizedRecord, RecordKind, RecordRef, Relation, RelationBasis, Result};

/// Canonical tracked-issue key shape: two or more capitals, hyphen, digits.
///
/// No trailing word boundary: `PROJ-42_hotfix` still yields `PROJ-42`, and
/// greedy `\d+` never stops inside a number.
pub const DEFAULT_ID_PATTERN: &str = r"\b[A-Z]{2,}-\d+";

static DEFAULT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_ID_PATTERN).unwrap_or_else(|_| unreachable!()));

static BRANCH_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([a-z]{2,})-(\d+)").unwrap_or_else(|_| unreachable!()));

/// Compiled default identifier pattern.
pub fn default_id_pattern() -> Regex {
    DEFAULT_ID_REGEX.clone()
}

/// Compile a user-supplied identifier pattern.
pub fn compile_id_pattern(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}

/// Extracts relations from a record set using one identifier pattern.
#[derive(Debug, Clone)]
pub struct Correlator {
    id_pattern: Regex,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(default_id_pattern())
    }
}

impl Correlator {
    pub fn new(id_pattern: Regex) -> Self {
        Self { id_pattern }
    }

    pub fn id_pattern(&self) -> &Regex {
        &self.id_pattern
    }

    /// Build the relation list for `records`.
    ///
    /// Never fails: records without matches simply contribute nothing.
    pub fn correlate(&self, records: &[NormalizedRecord]) -> Vec<Relation> {
        let mut by_identifier: HashMap<&str, Vec<RecordRef>> = HashMap::new();
        let mut tracked_upper: HashMap<String, Vec<RecordRef>> = HashMap::new();
        for record in records {
            by_identifier
                .entry(record.identifier.as_str())
                .or_default()
                .push(record.record_ref());
            if record.kind == RecordKind::TrackedIssue {
                tracked_upper
                    .entry(record.identifier.to_ascii_uppercase())
                    .or_default()
                    .push(record.record_ref());
            }
        }

        let mut relations = BTreeSet::new();
        for record in records {
            let from = record.record_ref();

            for text in &record.raw_refs {
                for candidate in self.id_pattern.find_iter(text) {
                    link_all(
                        &mut relations,
                        &from,
                        by_identifier.get(candidate.as_str()),
                        RelationBasis::IdentifierMatch,
                    );
                }
            }

            if record.kind == RecordKind::StackNode {
                for text in branch_texts(record) {
                    for caps in BRANCH_SLUG.captures_iter(text) {
                        let key = format!("{}-{}", caps[1].to_ascii_uppercase(), &caps[2]);
                        link_all(
                            &mut relations,
                            &from,
                            tracked_upper.get(&key),
                            RelationBasis::BranchMatch,
                        );
                    }
                }
            }
        }

        relations.into_iter().collect()
    }
}

fn link_all(
    relations: &mut BTreeSet<Relation>,
    from: &RecordRef,
    targets: Option<&Vec<RecordRef>>,
    basis: RelationBasis,
) {
    for to in targets.into_iter().flatten() {
        if to != from {
            relations.insert(Relation::new(from.clone(), to.clone(), basis));
        }
    }
}

/// Branch name plus any whitespace-free raw ref (branch-like tokens).
fn branch_texts(record: &NormalizedRecord) -> impl Iterator<Item = &str> {
    std::iter::once(record.identifier.as_str()).chain(
        record
            .raw_refs
            .iter()
            .map(String::as_str)
            .filter(move |t| *t != record.identifier && !t.chars().any(char::is_whitespace)),
    )
}

/// Correlate `records` with an explicit identifier pattern.
pub fn correlate(records: &[NormalizedRecord], id_pattern: &Regex) -> Vec<Relation> {
    Correlator::new(id_pattern.clone()).correlate(records)
}

/// Drop relations whose endpoints are not in `records`.
pub fn prune_dangling(relations: Vec<Relation>, records: &[NormalizedRecord]) -> Vec<Relation> {
    let known: HashSet<RecordRef> = records.iter().map(NormalizedRecord::record_ref).collect();
    relations
        .into_iter()
        .filter(|r| known.contains(&r.from) && known.contains(&r.to))
        .collect()
}

/// Bidirectional neighbour lookup over a relation list.
#[derive(Debug, Default)]
pub struct RelationGraph {
    neighbours: HashMap<RecordRef, BTreeSet<RecordRef>>,
}

impl RelationGraph {
    pub fn build(relations: &[Relation]) -> Self {
        let mut neighbours: HashMap<RecordRef, BTreeSet<RecordRef>> = HashMap::new();
        for rel in relations {
            neighbours
                .entry(rel.from.clone())
                .or_default()
                .insert(rel.to.clone());
            neighbours
                .entry(rel.to.clone())
                .or_default()
                .insert(rel.from.clone());
        }
        Self { neighbours }
    }

    /// Related records in ascending `RecordRef` order.
    pub fn neighbours(&self, record: &RecordRef) -> impl Iterator<Item = &RecordRef> {
        self.neighbours.get(record).into_iter().flatten()
    }

    pub fn first_neighbour(&self, record: &RecordRef) -> Option<&RecordRef> {
        self.neighbours(record).next()
    }
}
