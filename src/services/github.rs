//! GitHub proof fetching
//!
//! Thin wrapper over the public GitHub API, behind a trait so the flows can
//! be exercised against a stub. Any non-success status or transport failure
//! surfaces the upstream status/message; rate-limit backoff is the caller's
//! concern and nothing here retries.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubFetchError {
    #[error("GitHub returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone)]
pub struct GistFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Gist {
    pub owner_login: Option<String>,
    /// Sorted by filename; GitHub's file object carries no ordering, so the
    /// lexicographically first file is "first".
    pub files: Vec<GistFile>,
}

#[derive(Debug, Clone)]
pub struct IssueComment {
    pub author_login: String,
}

#[async_trait]
pub trait ProofFetcher: Send + Sync {
    async fn fetch_gist(&self, gist_id: &str) -> Result<Gist, GitHubFetchError>;

    async fn fetch_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
    ) -> Result<IssueComment, GitHubFetchError>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, GitHubFetchError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("User-Agent", "oraclenet-identity")
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GitHubFetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GitHubFetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GitHubFetchError::Network(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GistPayload {
    owner: Option<GistOwner>,
    #[serde(default)]
    files: HashMap<String, GistFilePayload>,
}

#[derive(Debug, Deserialize)]
struct GistOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GistFilePayload {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    user: CommentUser,
}

#[derive(Debug, Deserialize)]
struct CommentUser {
    login: String,
}

#[async_trait]
impl ProofFetcher for GitHubClient {
    async fn fetch_gist(&self, gist_id: &str) -> Result<Gist, GitHubFetchError> {
        let payload: GistPayload = self.get_json(&format!("/gists/{gist_id}")).await?;

        let mut files: Vec<GistFile> = payload
            .files
            .into_iter()
            .map(|(filename, file)| GistFile {
                filename,
                content: file.content.unwrap_or_default(),
            })
            .collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));

        Ok(Gist {
            owner_login: payload.owner.map(|o| o.login),
            files,
        })
    }

    async fn fetch_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
    ) -> Result<IssueComment, GitHubFetchError> {
        let payload: CommentPayload = self
            .get_json(&format!("/repos/{owner}/{repo}/issues/comments/{comment_id}"))
            .await?;

        Ok(IssueComment {
            author_login: payload.user.login,
        })
    }
}

/// Extract a gist id from a gist URL (`https://gist.github.com/{user}/{id}`)
/// or accept a bare id.
pub fn parse_gist_url(url: &str) -> Option<String> {
    let trimmed = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    // Gist ids are hex; this also stops a trailing username from passing.
    let id = trimmed.rsplit('/').next().unwrap_or_default();
    if id.len() >= 8 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// A birth-issue comment reference:
/// `https://github.com/{owner}/{repo}/issues/{n}#issuecomment-{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommentRef {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub comment_id: u64,
}

pub fn parse_issue_comment_url(url: &str) -> Option<IssueCommentRef> {
    let (path, fragment) = url.split_once('#')?;
    let comment_id = fragment.strip_prefix("issuecomment-")?.parse().ok()?;

    let after_host = path.split_once("github.com/")?.1;
    let mut segments = after_host.split('/');
    let owner = segments.next()?.to_string();
    let repo = segments.next()?.to_string();
    if segments.next()? != "issues" {
        return None;
    }
    let issue_number = segments.next()?.parse().ok()?;

    if owner.is_empty() || repo.is_empty() {
        return None;
    }

    Some(IssueCommentRef {
        owner,
        repo,
        issue_number,
        comment_id,
    })
}
