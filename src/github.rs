//! Pull request lookup for the PR columns.
//!
//! PRs come from the GitHub GraphQL API when a token is available, and from
//! the `gh` CLI otherwise. Either way the result is a map of head branch name
//! to [`PullRequest`], and any failure leaves the PR columns empty.

use std::{collections::HashMap, process::Command};

use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::json;

use crate::{branch::BranchRecord, config::Config, git};

// ============== PR Types ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Merged => write!(f, "MERGED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    /// `gh` reports an empty string when nobody has reviewed yet.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub state: PrState,
    pub review_decision: Option<ReviewDecision>,
}

/// One PR as reported by both `gh pr list --json` and the GraphQL API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrNode {
    head_ref_name: String,
    number: u64,
    url: String,
    state: PrState,
    #[serde(default)]
    review_decision: Option<ReviewDecision>,
}

/// Index PRs by head branch. Later entries replace earlier ones, so callers
/// pass PRs oldest first to let the newest PR for a branch win.
fn index_by_head(nodes: impl IntoIterator<Item = PrNode>) -> HashMap<String, PullRequest> {
    nodes
        .into_iter()
        .map(|node| {
            (
                node.head_ref_name,
                PullRequest {
                    number: node.number,
                    url: node.url,
                    state: node.state,
                    review_decision: node.review_decision,
                },
            )
        })
        .collect()
}

fn index_newest_first(nodes: Vec<PrNode>) -> HashMap<String, PullRequest> {
    index_by_head(nodes.into_iter().rev())
}

/// Attach each branch's PR, matched by head branch name.
pub fn join_pull_requests(
    records: &mut [BranchRecord],
    prs: &HashMap<String, PullRequest>,
) {
    for record in records.iter_mut() {
        record.pull_request = prs.get(&record.name).cloned();
    }
}

// ============== Error Types ==============

#[derive(Debug)]
pub enum GitHubError {
    /// Token is invalid or expired
    Unauthorized,
    /// Network/HTTP error
    Network(String),
    /// API error with message
    Api { status: u16, message: String },
    /// `gh` could not be run or exited unsuccessfully
    Cli(String),
    /// Response did not have the expected shape
    Decode(String),
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "GitHub token is invalid or expired"),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Api { status, message } => {
                write!(f, "GitHub API error ({}): {}", status, message)
            }
            Self::Cli(msg) => write!(f, "gh failed: {}", msg),
            Self::Decode(msg) => write!(f, "Unexpected PR data: {}", msg),
        }
    }
}

impl std::error::Error for GitHubError {}

// ============== Sources ==============

/// A batched, all-states PR query.
pub trait PullRequestSource {
    fn fetch(&self) -> Result<HashMap<String, PullRequest>, GitHubError>;
}

/// Run `source` once, degrading any failure to an empty map.
pub fn fetch_pull_requests(source: &dyn PullRequestSource) -> HashMap<String, PullRequest> {
    match source.fetch() {
        Ok(prs) => {
            tracing::debug!("Fetched {} pull requests", prs.len());
            prs
        }
        Err(error) => {
            tracing::warn!(%error, "Unable to fetch GitHub PR data");
            HashMap::new()
        }
    }
}

/// Choose the GraphQL client when a token and a GitHub remote are available,
/// falling back to the `gh` CLI.
pub fn pull_request_source(
    remote_url: Option<&str>,
    config: &Config,
) -> Box<dyn PullRequestSource> {
    let repo = remote_url.and_then(|url| {
        parse_remote_url(url)
            .inspect_err(|error| {
                tracing::debug!(%error, "Remote is not a GitHub URL");
            })
            .ok()
    });
    if let Some(repo) = repo
        && let Some(token) = find_github_token(&repo.host, config)
    {
        tracing::debug!("Querying PRs for {} via the GitHub API", repo.full_name());
        return Box::new(GitHubClient::new(token, repo, config.pr_limit));
    }
    tracing::debug!("Querying PRs via the gh CLI");
    Box::new(GhCli {
        limit: config.pr_limit,
    })
}

// ============== gh CLI ==============

const GH_FIELDS: &str = "headRefName,number,url,state,reviewDecision";

pub struct GhCli {
    pub limit: usize,
}

impl PullRequestSource for GhCli {
    fn fetch(&self) -> Result<HashMap<String, PullRequest>, GitHubError> {
        let limit = self.limit.to_string();
        let args = [
            "pr",
            "list",
            "--state",
            "all",
            "--limit",
            limit.as_str(),
            "--json",
            GH_FIELDS,
        ];
        tracing::debug!("Running `gh {}`", args.join(" "));
        let out = Command::new("gh")
            .args(args)
            .output()
            .map_err(|e| GitHubError::Cli(e.to_string()))?;
        if !out.status.success() {
            return Err(GitHubError::Cli(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }
        parse_gh_output(&out.stdout)
    }
}

/// `gh pr list` returns newest first.
fn parse_gh_output(stdout: &[u8]) -> Result<HashMap<String, PullRequest>, GitHubError> {
    let nodes: Vec<PrNode> =
        serde_json::from_slice(stdout).map_err(|e| GitHubError::Decode(e.to_string()))?;
    Ok(index_newest_first(nodes))
}

// ============== GraphQL API ==============

const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $first: Int!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    pullRequests(first: $first, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes { headRefName number url state reviewDecision }
    }
  }
}
"#;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_requests: PullRequestPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestPage {
    page_info: PageInfo,
    nodes: Vec<PrNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl GraphQlResponse {
    fn into_page(self) -> Result<PullRequestPage, GitHubError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(GitHubError::Api {
                status: 200,
                message: error.message,
            });
        }
        self.data
            .and_then(|data| data.repository)
            .map(|repository| repository.pull_requests)
            .ok_or_else(|| GitHubError::Decode("response has no repository".into()))
    }
}

/// Repository identification (owner/repo extracted from remote URL)
#[derive(Debug, Clone)]
pub struct RepoIdentifier {
    pub owner: String,
    pub repo: String,
    pub host: String,
}

impl RepoIdentifier {
    /// Returns the full repo path as "owner/repo"
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

pub struct GitHubClient {
    token: String,
    repo: RepoIdentifier,
    limit: usize,
}

impl GitHubClient {
    pub fn new(token: String, repo: RepoIdentifier, limit: usize) -> Self {
        Self { token, repo, limit }
    }

    fn graphql_url(&self) -> String {
        if self.repo.host == "github.com" {
            "https://api.github.com/graphql".to_string()
        } else {
            format!("https://{}/api/graphql", self.repo.host)
        }
    }

    fn query_page(
        &self,
        first: usize,
        cursor: Option<&str>,
    ) -> Result<PullRequestPage, GitHubError> {
        let body = json!({
            "query": PULL_REQUESTS_QUERY,
            "variables": {
                "owner": self.repo.owner,
                "repo": self.repo.repo,
                "first": first,
                "cursor": cursor,
            },
        });

        let mut response = ureq::post(&self.graphql_url())
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("User-Agent", "git-tree")
            .send_json(&body)
            .map_err(handle_ureq_error)?;

        let response: GraphQlResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        response.into_page()
    }
}

impl PullRequestSource for GitHubClient {
    fn fetch(&self) -> Result<HashMap<String, PullRequest>, GitHubError> {
        let nodes = collect_pages(self.limit, |first, cursor| self.query_page(first, cursor))?;
        Ok(index_newest_first(nodes))
    }
}

/// Pull pages until `limit` nodes are collected or the last page is reached.
/// Nodes keep the query's newest-first order.
fn collect_pages<F>(limit: usize, mut next_page: F) -> Result<Vec<PrNode>, GitHubError>
where
    F: FnMut(usize, Option<&str>) -> Result<PullRequestPage, GitHubError>,
{
    let mut nodes = Vec::new();
    let mut cursor: Option<String> = None;

    while nodes.len() < limit {
        let first = PAGE_SIZE.min(limit - nodes.len());
        let page = next_page(first, cursor.as_deref())?;
        nodes.extend(page.nodes);
        match page.page_info.end_cursor {
            Some(next) if page.page_info.has_next_page => cursor = Some(next),
            _ => break,
        }
    }

    nodes.truncate(limit);
    Ok(nodes)
}

fn handle_ureq_error(error: ureq::Error) -> GitHubError {
    match error {
        ureq::Error::StatusCode(401) => GitHubError::Unauthorized,
        ureq::Error::StatusCode(status) => GitHubError::Api {
            status,
            message: format!("HTTP status {status}"),
        },
        other => GitHubError::Network(other.to_string()),
    }
}

// ============== Helper Functions ==============

/// Parse GitHub remote URL to extract owner/repo
pub fn parse_remote_url(url: &str) -> Result<RepoIdentifier> {
    // Handle various URL formats:
    // - git@github.com:owner/repo.git
    // - https://github.com/owner/repo.git
    // - ssh://git@github.com/owner/repo.git
    let url = url.trim();

    let (host, path) = if let Some(rest) = url.strip_prefix("git@") {
        match rest.split_once(':') {
            Some(parts) => parts,
            None => bail!("Could not parse GitHub remote URL: {}", url),
        }
    } else {
        let without_protocol = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("ssh://git@"))
            .or_else(|| url.strip_prefix("ssh://"))
            .or_else(|| url.strip_prefix("git://"));
        match without_protocol.and_then(|rest| rest.split_once('/')) {
            Some(parts) => parts,
            None => bail!("Could not parse GitHub remote URL: {}", url),
        }
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    match path.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok(RepoIdentifier {
                host: host.to_string(),
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
        }
        _ => bail!(
            "Could not parse GitHub remote URL: {}. Expected format like 'git@github.com:owner/repo.git' or 'https://github.com/owner/repo'",
            url
        ),
    }
}

/// Find a GitHub token: env vars, then git config, then the config file.
fn find_github_token(host: &str, config: &Config) -> Option<String> {
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var)
            && !token.is_empty()
        {
            tracing::debug!("Using GitHub token from {} env var", var);
            return Some(token);
        }
    }

    if let Some(token) = git::config_value("github.token")
        && !token.is_empty()
    {
        tracing::debug!("Using GitHub token from git config");
        return Some(token);
    }

    config.token_for_host(host).map(|token| {
        tracing::debug!("Using GitHub token from config file");
        token.to_string()
    })
}
