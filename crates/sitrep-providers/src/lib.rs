//! sitrep-providers: gatherers for the sources sitrep reports on.
//!
//! Each provider turns one tool or API into [`NormalizedRecord`]s and never
//! fails the run: missing tooling becomes `Unavailable`, anything else an
//! `Error` result for that source alone.
//!
//! | kind | backend | record kind |
//! |---|---|---|
//! | `graphite` | `gt` + `git for-each-ref` | `stack_node` |
//! | `github` | `gh pr list` | `pr` |
//! | `linear` | GraphQL over HTTPS | `tracked_issue` |
//! | `beads` | `bd list` | `issue` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sitrep_core::{GatherResult, NormalizedRecord, ProviderConfig, Source, TimeWindow};

pub mod beads;
pub mod error;
pub mod exec;
pub mod github;
pub mod graphite;
pub mod linear;

pub use beads::BeadsGatherer;
pub use error::{ProviderError, Result};
pub use github::GithubGatherer;
pub use graphite::GraphiteGatherer;
pub use linear::LinearGatherer;

/// Registered provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Graphite,
    Github,
    Linear,
    Beads,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::Graphite, Self::Github, Self::Linear, Self::Beads];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graphite => "graphite",
            Self::Github => "github",
            Self::Linear => "linear",
            Self::Beads => "beads",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProviderError::UnknownKind(s.to_string()))
    }
}

/// Construct the [`Source`] for `kind` with `config`.
pub fn build_source(kind: ProviderKind, config: ProviderConfig) -> Result<Source> {
    let source = match kind {
        ProviderKind::Graphite => Source::new(config, Arc::new(GraphiteGatherer)),
        ProviderKind::Github => Source::new(config, Arc::new(GithubGatherer)),
        ProviderKind::Linear => Source::new(config, Arc::new(LinearGatherer::new()?)),
        ProviderKind::Beads => Source::new(config, Arc::new(BeadsGatherer)),
    };
    Ok(source)
}

/// Apply the page cap, then drop records outside the window.
pub(crate) fn page_result(
    records: Vec<NormalizedRecord>,
    window: &TimeWindow,
    cap: usize,
) -> GatherResult {
    GatherResult::from_page_where(records, cap, |r| window.admits(r))
}

/// `repo_dir` setting, defaulting to the working directory.
pub(crate) fn repo_dir(config: &ProviderConfig) -> PathBuf {
    PathBuf::from(config.setting_or("repo_dir", "."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sitrep_core::{resolve_at, RecordKind};

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!("GitHub".parse::<ProviderKind>().unwrap(), ProviderKind::Github);
        assert_eq!(" beads ".parse::<ProviderKind>().unwrap(), ProviderKind::Beads);
        assert!(matches!(
            "jira".parse::<ProviderKind>(),
            Err(ProviderError::UnknownKind(k)) if k == "jira"
        ));
    }

    #[test]
    fn test_build_source_keeps_config_id() {
        for kind in ProviderKind::ALL {
            let source = build_source(kind, ProviderConfig::new(format!("my-{kind}"))).unwrap();
            assert_eq!(source.id(), format!("my-{kind}"));
            assert_eq!(source.gatherer.kind(), kind.as_str());
        }
    }

    #[test]
    fn test_page_result_caps_then_filters() {
        let now = Utc::now();
        let window = resolve_at("1d", now).unwrap();
        let mut records: Vec<NormalizedRecord> = (0..4)
            .map(|i| {
                NormalizedRecord::new("gh", RecordKind::Pr, format!("{i}"), "t", "OPEN", now)
            })
            .collect();
        records.push(NormalizedRecord::new(
            "gh",
            RecordKind::Pr,
            "old",
            "t",
            "MERGED",
            now - Duration::days(9),
        ));

        match page_result(records, &window, 3) {
            GatherResult::PartialSuccess { records, .. } => {
                assert_eq!(records.len(), 3);
                assert!(records.iter().all(|r| r.identifier != "old"));
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[test]
    fn test_page_result_cap_hit_survives_window_filter() {
        let now = Utc::now();
        let window = resolve_at("1d", now).unwrap();
        let mut records: Vec<NormalizedRecord> = (0..3)
            .map(|i| {
                NormalizedRecord::new("gh", RecordKind::Pr, format!("{i}"), "t", "OPEN", now)
            })
            .collect();
        records.push(NormalizedRecord::new(
            "gh",
            RecordKind::Pr,
            "old",
            "t",
            "MERGED",
            now - Duration::days(9),
        ));

        match page_result(records, &window, 3) {
            GatherResult::PartialSuccess { records, warning } => {
                assert_eq!(records.len(), 3);
                assert!(warning.contains("page cap of 3"));
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[test]
    fn test_page_result_under_cap_is_success() {
        let now = Utc::now();
        let window = resolve_at("1d", now).unwrap();
        let records = vec![
            NormalizedRecord::new("gh", RecordKind::Pr, "1", "t", "OPEN", now),
            NormalizedRecord::new("gh", RecordKind::Pr, "2", "t", "MERGED", now - Duration::days(9)),
        ];

        match page_result(records, &window, 3) {
            GatherResult::Success { records } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].identifier, "1");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
