//! Per-source gather outcome.

use serde::{Deserialize, Serialize};

use crate::domain::record::NormalizedRecord;

/// Message recorded for a source that exceeded its timeout.
pub const TIMED_OUT: &str = "timed out";

/// Outcome of one gatherer invocation. Exactly one per source per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GatherResult {
    Success {
        records: Vec<NormalizedRecord>,
    },
    PartialSuccess {
        records: Vec<NormalizedRecord>,
        warning: String,
    },
    /// Source intentionally not configured, or its tool is absent.
    Unavailable {
        reason: String,
    },
    /// Unexpected failure of a configured source.
    Error {
        message: String,
    },
}

impl GatherResult {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self::error(TIMED_OUT)
    }

    /// Apply a page cap to an over-fetched page.
    ///
    /// More than `cap` records yields `PartialSuccess` holding the first `cap`
    /// records and a truncation warning.
    pub fn from_page(records: Vec<NormalizedRecord>, cap: usize) -> Self {
        Self::from_page_where(records, cap, |_| true)
    }

    /// Like [`GatherResult::from_page`], but keeps only records matching
    /// `keep`. The cap is judged on the unfiltered page, so a truncated page
    /// stays `PartialSuccess` even when filtering leaves `cap` or fewer.
    pub fn from_page_where(
        records: Vec<NormalizedRecord>,
        cap: usize,
        mut keep: impl FnMut(&NormalizedRecord) -> bool,
    ) -> Self {
        let fetched = records.len();
        let records: Vec<NormalizedRecord> =
            records.into_iter().take(cap).filter(|r| keep(r)).collect();
        if fetched > cap {
            Self::PartialSuccess {
                records,
                warning: format!("page cap of {cap} reached; {fetched}+ items available"),
            }
        } else {
            Self::Success { records }
        }
    }

    /// Records carried by this result (empty for unavailable/error).
    pub fn records(&self) -> &[NormalizedRecord] {
        match self {
            Self::Success { records } | Self::PartialSuccess { records, .. } => records,
            Self::Unavailable { .. } | Self::Error { .. } => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether this result carries records at all.
    pub fn has_records(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::PartialSuccess { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::Error { message } if message == TIMED_OUT)
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::PartialSuccess { .. } => "partial_success",
            Self::Unavailable { .. } => "unavailable",
            Self::Error { .. } => "error",
        }
    }

    /// Warning, reason or message attached to a non-success result.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::PartialSuccess { warning, .. } => Some(warning),
            Self::Unavailable { reason } => Some(reason),
            Self::Error { message } => Some(message),
        }
    }
}
