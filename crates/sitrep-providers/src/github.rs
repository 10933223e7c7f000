//! GitHub pull requests through the `gh` CLI.
//!
//! Settings: `repo` (`owner/name`, otherwise inferred by `gh` from
//! `repo_dir`), `repo_dir`, `gh_bin`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sitrep_core::{
    CheckState, GatherResult, Gatherer, NormalizedRecord, ProviderConfig, RecordKind,
    RecordSignals, ReviewState, TimeWindow,
};
use tracing::warn;

use crate::error::{ProviderError, Result};
use crate::exec::run_command;
use crate::{page_result, repo_dir};

const PR_FIELDS: &str =
    "number,title,body,headRefName,state,updatedAt,url,reviewDecision,statusCheckRollup,assignees";

/// Lists pull requests of one repository.
#[derive(Debug, Default, Clone, Copy)]
pub struct GithubGatherer;

#[async_trait]
impl Gatherer for GithubGatherer {
    fn kind(&self) -> &'static str {
        "github"
    }

    async fn fetch(&self, window: &TimeWindow, config: &ProviderConfig) -> GatherResult {
        match list_pull_requests(window, config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %config.source_id, error = %e, "github gather failed");
                e.into()
            }
        }
    }
}

/// Every open pull request first, then ones closed or merged since the
/// window opened. Each listing fetches up to `cap + 1`.
async fn list_pull_requests(window: &TimeWindow, config: &ProviderConfig) -> Result<GatherResult> {
    let mut records = gh_pr_list(config, &["--state", "open"]).await?;

    let recent = format!(
        "updated:>={} sort:updated-desc",
        window.since.format("%Y-%m-%d")
    );
    records.extend(gh_pr_list(config, &["--state", "closed", "--search", &recent]).await?);

    Ok(page_result(records, window, config.page_cap))
}

async fn gh_pr_list(config: &ProviderConfig, filter: &[&str]) -> Result<Vec<NormalizedRecord>> {
    let gh = config.setting_or("gh_bin", "gh");
    let limit = (config.page_cap + 1).to_string();
    let mut args = vec!["pr", "list"];
    args.extend_from_slice(filter);
    args.extend(["--json", PR_FIELDS, "--limit", &limit]);
    if let Some(repo) = config.setting("repo") {
        args.extend(["--repo", repo]);
    }

    let stdout = run_command(gh, &args, Some(&repo_dir(config)))
        .await
        .map_err(detect_auth_failure)?;
    parse_pull_requests(&stdout, &config.source_id)
}

/// `gh` reports a missing login as an ordinary non-zero exit.
fn detect_auth_failure(err: ProviderError) -> ProviderError {
    match err {
        ProviderError::CommandFailed { ref stderr, .. } => {
            let lower = stderr.to_ascii_lowercase();
            if lower.contains("gh auth login") || lower.contains("not logged in") {
                ProviderError::NotAuthenticated("gh".to_string())
            } else {
                err
            }
        }
        other => other,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    head_ref_name: Option<String>,
    state: String,
    updated_at: DateTime<Utc>,
    url: String,
    #[serde(default)]
    review_decision: Option<String>,
    #[serde(default)]
    status_check_rollup: Option<Vec<GhCheck>>,
    #[serde(default)]
    assignees: Vec<GhUser>,
}

/// Either a check run (`status`/`conclusion`) or a commit status (`state`).
#[derive(Debug, Deserialize)]
struct GhCheck {
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

/// Parse `gh pr list --json` output into records.
pub fn parse_pull_requests(json: &str, source_id: &str) -> Result<Vec<NormalizedRecord>> {
    let prs: Vec<GhPullRequest> = serde_json::from_str(json)?;
    Ok(prs
        .into_iter()
        .map(|pr| {
            let signals = RecordSignals {
                checks: pr.status_check_rollup.as_deref().and_then(rollup_state),
                review: pr.review_decision.as_deref().and_then(review_state),
                assignee: pr.assignees.into_iter().next().map(|u| u.login),
                priority: None,
            };
            NormalizedRecord::new(
                source_id,
                RecordKind::Pr,
                pr.number.to_string(),
                pr.title,
                pr.state,
                pr.updated_at,
            )
            .with_url(pr.url)
            .with_optional_ref(pr.body)
            .with_optional_ref(pr.head_ref_name)
            .with_signals(signals)
        })
        .collect())
}

/// Any failure wins, then anything unfinished; an empty rollup is unknown.
fn rollup_state(checks: &[GhCheck]) -> Option<CheckState> {
    if checks.is_empty() {
        return None;
    }

    let mut pending = false;
    for check in checks {
        let verdict = check
            .conclusion
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(check.state.as_deref())
            .unwrap_or_default()
            .to_ascii_uppercase();
        match verdict.as_str() {
            "FAILURE" | "ERROR" | "TIMED_OUT" | "CANCELLED" | "ACTION_REQUIRED"
            | "STARTUP_FAILURE" => return Some(CheckState::Failing),
            "SUCCESS" | "NEUTRAL" | "SKIPPED" => {}
            _ => pending = true,
        }
    }

    Some(if pending {
        CheckState::Pending
    } else {
        CheckState::Passing
    })
}

fn review_state(decision: &str) -> Option<ReviewState> {
    match decision {
        "APPROVED" => Some(ReviewState::Approved),
        "REVIEW_REQUIRED" => Some(ReviewState::ReviewRequired),
        "CHANGES_REQUESTED" => Some(ReviewState::ChangesRequested),
        _ => None,
    }
}
