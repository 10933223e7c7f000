//! Cross-source relations and attention items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::record::RecordRef;

/// How a relation was established.
///
/// `BranchMatch` is advisory: it comes from a case-insensitive slug in a
/// branch name and should be weighted below `IdentifierMatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationBasis {
    IdentifierMatch,
    BranchMatch,
}

/// Directed link between two records. Consumers read it bidirectionally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: RecordRef,
    pub to: RecordRef,
    pub basis: RelationBasis,
}

impl Relation {
    pub fn new(from: RecordRef, to: RecordRef, basis: RelationBasis) -> Self {
        Self { from, to, basis }
    }

    /// The other endpoint, if `record` is one of them.
    pub fn other(&self, record: &RecordRef) -> Option<&RecordRef> {
        if &self.from == record {
            Some(&self.to)
        } else if &self.to == record {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Attention severity. Ordered so that `Severe` is the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// Derived signal that a record needs human action. Recomputed every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionItem {
    pub record: RecordRef,
    pub severity: Severity,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
    /// Related record mentioned in `reason`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RecordRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_other_endpoint() {
        let pr = RecordRef::new("github", "42");
        let issue = RecordRef::new("linear", "PROJ-42");
        let rel = Relation::new(pr.clone(), issue.clone(), RelationBasis::IdentifierMatch);

        assert_eq!(rel.other(&pr), Some(&issue));
        assert_eq!(rel.other(&issue), Some(&pr));
        assert_eq!(rel.other(&RecordRef::new("x", "y")), None);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Severe > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
    }

    #[test]
    fn test_basis_serializes_kebab_case() {
        let json = serde_json::to_string(&RelationBasis::BranchMatch).unwrap();
        assert_eq!(json, "\"branch-match\"");
    }
}
