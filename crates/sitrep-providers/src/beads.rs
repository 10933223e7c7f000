//! Beads: the repository-local issue store managed by `bd`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sitrep_core::{
    GatherResult, Gatherer, NormalizedRecord, Priority, ProviderConfig, RecordKind, RecordSignals,
    TimeWindow,
};
use tracing::warn;

use crate::error::{ProviderError, Result};
use crate::exec::run_command;
use crate::{page_result, repo_dir};

/// Lists issues from `.beads/` in `repo_dir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeadsGatherer;

#[async_trait]
impl Gatherer for BeadsGatherer {
    fn kind(&self) -> &'static str {
        "beads"
    }

    async fn fetch(&self, window: &TimeWindow, config: &ProviderConfig) -> GatherResult {
        match list_issues(window, config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %config.source_id, error = %e, "beads gather failed");
                e.into()
            }
        }
    }
}

async fn list_issues(window: &TimeWindow, config: &ProviderConfig) -> Result<GatherResult> {
    let dir = repo_dir(config);
    if !dir.join(".beads").is_dir() {
        return Err(ProviderError::NotInitialised("beads".to_string()));
    }

    let limit = (config.page_cap + 1).to_string();
    let stdout = run_command(
        config.setting_or("bd_bin", "bd"),
        &["list", "--json", "--limit", &limit],
        Some(&dir),
    )
    .await?;

    let records = parse_issues(&stdout, &config.source_id)?;
    Ok(page_result(records, window, config.page_cap))
}

#[derive(Debug, Deserialize)]
struct BdIssue {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: String,
    #[serde(default)]
    priority: Option<u8>,
    #[serde(default)]
    assignee: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Parse `bd list --json` output. Empty output or `null` means no issues.
pub fn parse_issues(json: &str, source_id: &str) -> Result<Vec<NormalizedRecord>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let issues: Option<Vec<BdIssue>> = serde_json::from_str(json)?;

    Ok(issues
        .unwrap_or_default()
        .into_iter()
        .map(|issue| {
            let signals = RecordSignals {
                priority: issue.priority.map(priority),
                assignee: issue.assignee.filter(|a| !a.trim().is_empty()),
                ..Default::default()
            };
            NormalizedRecord::new(
                source_id,
                RecordKind::Issue,
                issue.id,
                issue.title,
                issue.status,
                issue.updated_at,
            )
            .with_optional_ref(issue.description)
            .with_signals(signals)
        })
        .collect())
}

/// bd priorities run 0 (critical) to 4 (backlog).
fn priority(level: u8) -> Priority {
    match level {
        0 => Priority::Urgent,
        1 => Priority::High,
        2 => Priority::Medium,
        3 => Priority::Low,
        _ => Priority::None,
    }
}
