//! Normalized record model shared by every gatherer.
//!
//! Records are created once by a gatherer and never mutated afterwards.
//! Downstream stages attach annotations in side structures keyed by
//! [`RecordRef`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of work item a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Pull request on the code host.
    Pr,
    /// Issue in a local issue store.
    Issue,
    /// Issue in the remote tracker (carries the canonical `ABC-123` keys).
    TrackedIssue,
    /// Branch managed by the stack tool.
    StackNode,
}

/// `(source_id, identifier)` key of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub source_id: String,
    pub identifier: String,
}

impl RecordRef {
    pub fn new(source_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.identifier)
    }
}

/// Aggregate CI/check state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Passing,
    Failing,
    Pending,
}

/// Review/approval state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ReviewRequired,
    ChangesRequested,
}

impl ReviewState {
    /// Whether the item cannot merge until a reviewer acts.
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::ReviewRequired | Self::ChangesRequested)
    }
}

/// Priority normalized across trackers. `Urgent` is the highest tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    None,
}

/// Optional status signals a gatherer may know about a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSignals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<CheckState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

const TERMINAL_STATES: &[&str] = &["closed", "merged", "done", "completed", "canceled", "cancelled"];

/// Common shape every gatherer produces per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source_id: String,
    pub kind: RecordKind,
    pub identifier: String,
    pub title: String,
    pub state: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free text (title, body, branch name) mined for cross-references.
    #[serde(default)]
    pub raw_refs: Vec<String>,
    #[serde(default)]
    pub signals: RecordSignals,
}

impl NormalizedRecord {
    /// Create a record. The title is seeded into `raw_refs` when non-empty.
    pub fn new(
        source_id: impl Into<String>,
        kind: RecordKind,
        identifier: impl Into<String>,
        title: impl Into<String>,
        state: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let raw_refs = if title.trim().is_empty() {
            Vec::new()
        } else {
            vec![title.clone()]
        };
        Self {
            source_id: source_id.into(),
            kind,
            identifier: identifier.into(),
            title,
            state: state.into(),
            updated_at,
            url: None,
            raw_refs,
            signals: RecordSignals::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a free-text field for correlation. Blank or duplicate text is skipped.
    pub fn with_ref(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() && !self.raw_refs.contains(&text) {
            self.raw_refs.push(text);
        }
        self
    }

    /// Add an optional free-text field.
    pub fn with_optional_ref(self, text: Option<impl Into<String>>) -> Self {
        match text {
            Some(text) => self.with_ref(text),
            None => self,
        }
    }

    pub fn with_signals(mut self, signals: RecordSignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef::new(&self.source_id, &self.identifier)
    }

    /// Whether the item is finished (merged, closed, done...).
    pub fn is_terminal(&self) -> bool {
        let state = self.state.trim().to_ascii_lowercase();
        TERMINAL_STATES.contains(&state.as_str())
    }
}
