//! Linear issues over the GraphQL API.
//!
//! Settings: `api_key` (required), `team` (team key filter), `endpoint`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use sitrep_core::{
    GatherResult, Gatherer, NormalizedRecord, Priority, ProviderConfig, RecordKind, RecordSignals,
    TimeWindow,
};
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::page_result;

pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

const ISSUES_QUERY: &str = r#"query Issues($first: Int!, $filter: IssueFilter) {
  issues(first: $first, filter: $filter, orderBy: updatedAt) {
    nodes {
      identifier
      title
      description
      branchName
      priority
      updatedAt
      url
      state { name type }
      assignee { name }
    }
  }
}"#;

/// Linear state types that mean the issue is finished.
const TERMINAL_TYPES: &[&str] = &["completed", "canceled"];

/// Lists issues, optionally restricted to one team.
#[derive(Debug, Clone)]
pub struct LinearGatherer {
    client: reqwest::Client,
}

impl LinearGatherer {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sitrep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn list_issues(
        &self,
        window: &TimeWindow,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<GatherResult> {
        let endpoint = config.setting_or("endpoint", DEFAULT_ENDPOINT);
        let mut variables = json!({ "first": config.page_cap + 1 });
        if let Some(team) = config.setting("team") {
            variables["filter"] = json!({ "team": { "key": { "eq": team } } });
        }

        debug!(source = %config.source_id, endpoint, "querying linear");
        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, api_key)
            .json(&json!({ "query": ISSUES_QUERY, "variables": variables }))
            .send()
            .await?;

        check_status(response.status())?;
        let body = response.text().await?;
        let records = parse_issues(&body, &config.source_id)?;
        Ok(page_result(records, window, config.page_cap))
    }
}

#[async_trait]
impl Gatherer for LinearGatherer {
    fn kind(&self) -> &'static str {
        "linear"
    }

    async fn fetch(&self, window: &TimeWindow, config: &ProviderConfig) -> GatherResult {
        let api_key = match config.require("api_key") {
            Ok(key) => key,
            Err(unavailable) => return unavailable,
        };

        match self.list_issues(window, config, api_key).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %config.source_id, error = %e, "linear gather failed");
                e.into()
            }
        }
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ProviderError::Unauthorized("linear".to_string()))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
        s if !s.is_success() => Err(ProviderError::Status {
            service: "linear".to_string(),
            status: s.as_u16(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<IssuesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
struct IssueConnection {
    nodes: Vec<LinearIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinearIssue {
    identifier: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    branch_name: Option<String>,
    #[serde(default)]
    priority: Option<f64>,
    updated_at: DateTime<Utc>,
    url: String,
    state: LinearState,
    #[serde(default)]
    assignee: Option<LinearUser>,
}

#[derive(Debug, Deserialize)]
struct LinearState {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct LinearUser {
    name: String,
}

/// Parse a GraphQL response body into records.
pub fn parse_issues(body: &str, source_id: &str) -> Result<Vec<NormalizedRecord>> {
    let response: GraphQlResponse = serde_json::from_str(body)?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(ProviderError::Remote(format!("linear: {}", messages.join("; "))));
    }
    let data = response
        .data
        .ok_or_else(|| ProviderError::Parse("linear response has no data".to_string()))?;

    Ok(data
        .issues
        .nodes
        .into_iter()
        .map(|issue| {
            // custom workflow names ("Shipped") still need to read as finished
            let state = if TERMINAL_TYPES.contains(&issue.state.kind.as_str()) {
                issue.state.kind
            } else {
                issue.state.name
            };
            let signals = RecordSignals {
                priority: issue.priority.map(priority),
                assignee: issue.assignee.map(|a| a.name),
                ..Default::default()
            };
            NormalizedRecord::new(
                source_id,
                RecordKind::TrackedIssue,
                issue.identifier,
                issue.title,
                state,
                issue.updated_at,
            )
            .with_url(issue.url)
            .with_optional_ref(issue.description)
            .with_optional_ref(issue.branch_name)
            .with_signals(signals)
        })
        .collect())
}

/// Linear priorities: 0 none, 1 urgent through 4 low.
fn priority(level: f64) -> Priority {
    match level.round() as i64 {
        1 => Priority::Urgent,
        2 => Priority::High,
        3 => Priority::Medium,
        4 => Priority::Low,
        _ => Priority::None,
    }
}
