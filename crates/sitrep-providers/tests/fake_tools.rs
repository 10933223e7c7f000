//! CLI-backed gatherers driven end to end against stand-in scripts.
//!
//! Each test writes a small shell script in place of `gh`, `bd` or `git` and
//! points the gatherer at it through the `*_bin` settings.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sitrep_core::{
    resolve_at, CheckState, GatherResult, Gatherer, Priority, ProviderConfig, TimeWindow,
};
use sitrep_providers::{BeadsGatherer, GithubGatherer, GraphiteGatherer};
use tokio::sync::Mutex;

/// Writing an executable while another test forks can fail with ETXTBSY.
static SCRIPTS: Mutex<()> = Mutex::const_new(());

fn window() -> TimeWindow {
    let now = "2026-03-10T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
    resolve_at("7d", now).unwrap()
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn github_lists_open_then_recently_closed_pull_requests() {
    let _guard = SCRIPTS.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let args_file = dir.path().join("args");
    let gh = write_script(
        dir.path(),
        "gh",
        &format!(
            r#"echo "$@" >> {args}
case "$*" in
*"--state open"*) cat <<'JSON'
[
  {{"number": 2, "title": "PROJ-9 retry uploads", "body": "", "headRefName": "proj-9-retry",
    "state": "OPEN", "updatedAt": "2026-01-09T10:00:00Z", "url": "https://example.test/pull/2",
    "reviewDecision": "REVIEW_REQUIRED",
    "statusCheckRollup": [{{"status": "COMPLETED", "conclusion": "FAILURE"}}],
    "assignees": []}}
]
JSON
;;
*) cat <<'JSON'
[
  {{"number": 7, "title": "Bump deps", "body": "", "headRefName": "deps",
    "state": "MERGED", "updatedAt": "2026-03-09T10:00:00Z", "url": "https://example.test/pull/7",
    "reviewDecision": "APPROVED", "statusCheckRollup": [], "assignees": []}}
]
JSON
;;
esac"#,
            args = args_file.display()
        ),
    );

    let config = ProviderConfig::new("github")
        .with_page_cap(10)
        .with_setting("gh_bin", gh.display().to_string())
        .with_setting("repo", "acme/web")
        .with_setting("repo_dir", dir.path().display().to_string());

    let result = GithubGatherer.fetch(&window(), &config).await;
    let records = match result {
        GatherResult::Success { records } => records,
        other => panic!("expected success, got {other:?}"),
    };
    let ids: Vec<_> = records.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["2", "7"], "old open PR is kept alongside recent merges");
    assert_eq!(records[0].signals.checks, Some(CheckState::Failing));

    let args = std::fs::read_to_string(&args_file).unwrap();
    let calls: Vec<&str> = args.lines().collect();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("--state open"));
    assert!(calls[1].contains("--state closed --search updated:>=2026-03-03 sort:updated-desc"));
    assert!(calls.iter().all(|c| c.contains("--limit 11") && c.contains("--repo acme/web")));
}

#[tokio::test]
async fn github_login_prompt_is_unavailable() {
    let _guard = SCRIPTS.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let gh = write_script(
        dir.path(),
        "gh",
        "echo 'To get started with GitHub CLI, please run:  gh auth login' >&2\nexit 4",
    );

    let config = ProviderConfig::new("github").with_setting("gh_bin", gh.display().to_string());
    let result = GithubGatherer.fetch(&window(), &config).await;
    assert_eq!(result, GatherResult::unavailable("gh not authenticated"));
}

#[tokio::test]
async fn beads_page_cap_yields_partial_success() {
    let _guard = SCRIPTS.lock().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".beads")).unwrap();
    let bd = write_script(
        dir.path(),
        "bd",
        r#"cat <<'JSON'
[
  {"id": "web-1", "title": "one", "status": "open", "priority": 0, "updated_at": "2026-03-09T10:00:00Z"},
  {"id": "web-2", "title": "two", "status": "open", "priority": 2, "updated_at": "2026-03-08T10:00:00Z"},
  {"id": "web-3", "title": "three", "status": "open", "priority": 4, "updated_at": "2026-03-07T10:00:00Z"}
]
JSON"#,
    );

    let config = ProviderConfig::new("beads")
        .with_page_cap(2)
        .with_setting("bd_bin", bd.display().to_string())
        .with_setting("repo_dir", dir.path().display().to_string());

    match BeadsGatherer.fetch(&window(), &config).await {
        GatherResult::PartialSuccess { records, warning } => {
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].signals.priority, Some(Priority::Urgent));
            assert!(warning.contains("page cap of 2"));
        }
        other => panic!("expected partial success, got {other:?}"),
    }
}

#[tokio::test]
async fn graphite_lists_branches_except_trunk() {
    let _guard = SCRIPTS.lock().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git/.graphite_repo_config"), "{}").unwrap();

    let gt = write_script(dir.path(), "gt", "echo 1.4.0");
    let git = write_script(
        dir.path(),
        "git",
        "printf 'develop\\t2026-03-10T08:00:00+00:00\\tMerge\\n'\n\
         printf 'proj-9-retry\\t2026-03-09T08:00:00+00:00\\tPROJ-9 retry uploads\\n'",
    );

    let config = ProviderConfig::new("graphite")
        .with_setting("gt_bin", gt.display().to_string())
        .with_setting("git_bin", git.display().to_string())
        .with_setting("trunk", "develop")
        .with_setting("repo_dir", dir.path().display().to_string());

    let result = GraphiteGatherer.fetch(&window(), &config).await;
    let records = result.records();
    assert!(result.is_success());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identifier, "proj-9-retry");
    assert_eq!(records[0].raw_refs, vec!["PROJ-9 retry uploads", "proj-9-retry"]);
}
