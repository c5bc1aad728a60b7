//! GitHub provider (REST v3) for PR diffs, comments and repository contents.
//!
//! Endpoints used:
//!   * GET  /repos/{owner}/{repo}/pulls/{number}            (JSON metadata)
//!   * GET  /repos/{owner}/{repo}/pulls/{number}            (Accept: diff)
//!   * POST /repos/{owner}/{repo}/issues/{number}/comments
//!   * GET  /repos/{owner}/{repo}/contents/{path}            (listing / raw)

use reqwest::{Client, RequestBuilder, Response, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::{GitContextEngineError, GitContextEngineProviderError, GitContextEngineResult};
use crate::filters::is_binary_path;
use crate::git_providers::types::*;

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

/// GitHub HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
}

impl GitHubClient {
    /// Constructs a GitHub client with a shared HTTP instance.
    pub fn new(http: Client, base_api: String) -> Self {
        debug!("Creating GitHubClient with base_api={}", base_api);
        Self { http, base_api }
    }

    fn get(&self, url: &str, token: &AccessToken, accept: &'static str) -> RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(token.expose())
            .header(header::ACCEPT, accept)
    }

    /// Fetches title/description and the raw unified diff of a pull request.
    #[instrument(skip_all, fields(pr = %pr))]
    pub async fn fetch_diff(
        &self,
        token: &AccessToken,
        pr: &PullRequestRef,
    ) -> GitContextEngineResult<PullRequestDiff> {
        validate_owner_repo(&pr.owner, &pr.repo)?;
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_api,
            urlencoding::encode(&pr.owner),
            urlencoding::encode(&pr.repo),
            pr.number
        );
        debug!("GitHub fetch_diff: {}", url);

        let meta: GitHubPr = check_status(self.get(&url, token, ACCEPT_JSON).send().await?)
            .await?
            .json()
            .await?;

        let diff = check_status(self.get(&url, token, ACCEPT_DIFF).send().await?)
            .await?
            .text()
            .await?;

        Ok(PullRequestDiff {
            title: meta.title,
            description: meta.body,
            diff,
            web_url: meta.html_url,
        })
    }

    /// Posts a top-level comment on the pull request conversation.
    #[instrument(skip_all, fields(pr = %pr, body_len = body.len()))]
    pub async fn post_comment(
        &self,
        token: &AccessToken,
        pr: &PullRequestRef,
        body: &str,
    ) -> GitContextEngineResult<()> {
        validate_owner_repo(&pr.owner, &pr.repo)?;
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_api,
            urlencoding::encode(&pr.owner),
            urlencoding::encode(&pr.repo),
            pr.number
        );
        debug!("GitHub post_comment: {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token.expose())
            .header(header::ACCEPT, ACCEPT_JSON)
            .json(&GitHubCommentCreate { body })
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Recursively lists text files under `path`, fetching each file raw.
    ///
    /// Binary-looking paths and non UTF-8 contents are skipped.
    #[instrument(skip_all, fields(repo = %format!("{owner}/{repo}"), path = %path))]
    pub async fn list_files(
        &self,
        token: &AccessToken,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> GitContextEngineResult<Vec<RepoFile>> {
        validate_owner_repo(owner, repo)?;

        let mut out = Vec::new();
        let mut pending_dirs = vec![path.trim_matches('/').to_string()];

        while let Some(dir) = pending_dirs.pop() {
            let url = self.contents_url(owner, repo, &dir);
            debug!("GitHub list contents: {}", url);

            let entries: Vec<GitHubContentEntry> =
                check_status(self.get(&url, token, ACCEPT_JSON).send().await?)
                    .await?
                    .json()
                    .await?;

            for entry in entries {
                match entry.kind.as_str() {
                    "dir" => pending_dirs.push(entry.path),
                    "file" if is_binary_path(&entry.path) => {
                        debug!(path = %entry.path, "skipping binary file");
                    }
                    "file" => {
                        let file_url = self.contents_url(owner, repo, &entry.path);
                        let bytes = check_status(self.get(&file_url, token, ACCEPT_RAW).send().await?)
                            .await?
                            .bytes()
                            .await?;
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(content) => out.push(RepoFile {
                                path: entry.path,
                                content,
                            }),
                            Err(_) => debug!(path = %entry.path, "skipping non utf-8 file"),
                        }
                    }
                    other => debug!(path = %entry.path, kind = other, "skipping entry"),
                }
            }
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(files = out.len(), "GitHub list_files done");
        Ok(out)
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let encoded = encode_path(path);
        if encoded.is_empty() {
            format!(
                "{}/repos/{}/{}/contents",
                self.base_api,
                urlencoding::encode(owner),
                urlencoding::encode(repo)
            )
        } else {
            format!(
                "{}/repos/{}/{}/contents/{}",
                self.base_api,
                urlencoding::encode(owner),
                urlencoding::encode(repo),
                encoded
            )
        }
    }
}

/// Percent-encodes each path segment, keeping the `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn validate_owner_repo(owner: &str, repo: &str) -> GitContextEngineResult<()> {
    if owner.trim().is_empty() || repo.trim().is_empty() {
        return Err(GitContextEngineError::Validation(format!(
            "invalid GitHub repository '{owner}/{repo}', expected 'owner/repo'"
        )));
    }
    Ok(())
}

/// Passes 2xx through; maps everything else into the typed provider error.
async fn check_status(resp: Response) -> GitContextEngineResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();

    warn!(
        %status,
        %url,
        body = %body.chars().take(200).collect::<String>(),
        "GitHub request failed"
    );

    Err(GitContextEngineProviderError::from_status(status.as_u16(), retry_after).into())
}

/// GitHub PR response (subset).
#[derive(Debug, Deserialize)]
struct GitHubPr {
    title: String,
    body: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubContentEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct GitHubCommentCreate<'a> {
    body: &'a str,
}
