//! Graphite stacks: local branches of a `gt`-initialised repository.
//!
//! `gt` only has to be present; branch data comes from `git for-each-ref`,
//! which is stable and scriptable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitrep_core::{GatherResult, Gatherer, NormalizedRecord, ProviderConfig, RecordKind, TimeWindow};
use tracing::warn;

use crate::error::{ProviderError, Result};
use crate::exec::run_command;
use crate::{page_result, repo_dir};

const REF_FORMAT: &str = "--format=%(refname:short)%09%(committerdate:iso-strict)%09%(contents:subject)";

/// Lists stack branches of one repository.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphiteGatherer;

#[async_trait]
impl Gatherer for GraphiteGatherer {
    fn kind(&self) -> &'static str {
        "graphite"
    }

    async fn fetch(&self, window: &TimeWindow, config: &ProviderConfig) -> GatherResult {
        match list_branches(window, config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %config.source_id, error = %e, "graphite gather failed");
                e.into()
            }
        }
    }
}

async fn list_branches(window: &TimeWindow, config: &ProviderConfig) -> Result<GatherResult> {
    let dir = repo_dir(config);
    run_command(config.setting_or("gt_bin", "gt"), &["--version"], None).await?;
    if !dir.join(".git").join(".graphite_repo_config").is_file() {
        return Err(ProviderError::NotInitialised("graphite".to_string()));
    }

    // one extra for trunk, one extra to detect truncation
    let count = format!("--count={}", config.page_cap + 2);
    let stdout = run_command(
        config.setting_or("git_bin", "git"),
        &["for-each-ref", "--sort=-committerdate", &count, REF_FORMAT, "refs/heads"],
        Some(&dir),
    )
    .await?;

    let trunk = config.setting_or("trunk", "main");
    let records = parse_branches(&stdout, &config.source_id, trunk)?;
    Ok(page_result(records, window, config.page_cap))
}

/// Parse tab-separated `for-each-ref` lines, skipping `trunk`.
pub fn parse_branches(output: &str, source_id: &str, trunk: &str) -> Result<Vec<NormalizedRecord>> {
    let mut records = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.splitn(3, '\t');
        let (Some(branch), Some(date)) = (fields.next(), fields.next()) else {
            return Err(ProviderError::Parse(line.to_string()));
        };
        if branch == trunk {
            continue;
        }
        let subject = fields.next().unwrap_or_default();
        let updated_at = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|e| ProviderError::Parse(format!("{date}: {e}")))?
            .with_timezone(&Utc);

        records.push(
            NormalizedRecord::new(source_id, RecordKind::StackNode, branch, subject, "open", updated_at)
                .with_ref(branch),
        );
    }
    Ok(records)
}
