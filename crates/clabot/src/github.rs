//! Pull request source abstraction and its GitHub implementation.
//!
//! `PullRequestSource` mediates every read and write against the
//! hosting provider for one repository. The reconciler only ever talks
//! to this trait, which keeps it testable against in-memory fakes.
//!
//! `GitHubSource` is the production implementation: bearer-token REST
//! calls against the GitHub API, paginated PR listing driven by the
//! `Link` response header, a run-scoped per-PR label cache, and
//! authorship extraction from the PR's patch text.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::EngineError;

/// Request timeout for every provider round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for the open-PR listing.
const PAGE_SIZE: u32 = 100;

/// An open pull request as seen by the engine.
///
/// Fetched once per run and cached for the run's duration; label state
/// is read separately through [`PullRequestSource::get_labels`].
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number, unique within the repository.
    pub number: u64,
    /// PR title, used only in the run trace.
    pub title: String,
    /// Locator for the unified diff of the PR's commits.
    pub patch_url: String,
}

/// Mediates all reads and writes against the hosting provider.
#[async_trait]
pub trait PullRequestSource {
    /// Fetch every page of open pull requests, concatenated in
    /// provider order.
    async fn list_open_pull_requests(&mut self) -> Result<Vec<PullRequest>, EngineError>;

    /// The PR's current label set, cached per PR for the run. A second
    /// call for the same PR returns the cached value without a network
    /// round-trip.
    async fn get_labels(&mut self, pr: &PullRequest) -> Result<Vec<String>, EngineError>;

    /// Extract the author email from the first commit of the PR's
    /// patch.
    async fn get_author_email(&mut self, pr: &PullRequest) -> Result<String, EngineError>;

    /// Idempotent, additive label application.
    async fn apply_label(&mut self, pr: &PullRequest, label: &str) -> Result<(), EngineError>;

    /// Idempotent label removal; absence of the label is not an error.
    async fn remove_label(&mut self, pr: &PullRequest, label: &str) -> Result<(), EngineError>;

    /// Append a comment. Not idempotent at the protocol level; callers
    /// must guarantee at-most-once semantics.
    async fn post_comment(&mut self, pr: &PullRequest, body: &str) -> Result<(), EngineError>;

    /// Whether the PR currently carries the given label.
    async fn has_label(&mut self, pr: &PullRequest, label: &str) -> Result<bool, EngineError> {
        Ok(self.get_labels(pr).await?.iter().any(|l| l == label))
    }
}

/// GitHub REST implementation of [`PullRequestSource`].
pub struct GitHubSource {
    http: HttpClient,
    api_base: String,
    token: String,
    owner: String,
    repo: String,
    /// Run-scoped label cache, keyed by PR number. Never invalidated
    /// within a run; labels the engine applies are not reflected back.
    label_cache: HashMap<u64, Vec<String>>,
}

/// GitHub error response body.
#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

/// A label object as returned by the issues API.
#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

impl GitHubSource {
    /// Create a source for the repository named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let http = HttpClient::builder()
            .user_agent("clabot/0.3")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            label_cache: HashMap::new(),
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{tail}",
            self.api_base, self.owner, self.repo
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, EngineError> {
        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        Ok(response)
    }

    /// Decode a non-success response into a `SourceUnavailable` error.
    async fn fail(context: &str, response: Response) -> EngineError {
        let status = response.status();
        let message = response
            .json::<GitHubError>()
            .await
            .map(|e| e.message)
            .unwrap_or_else(|_| "<no error body>".to_string());
        EngineError::source(format!("{context}: {status} - {message}"))
    }

    async fn fetch_page(&self, page: u32) -> Result<Response, EngineError> {
        let url = self.repo_url("pulls");
        let response = self
            .send(self.http.get(&url).query(&[
                ("state", "open".to_string()),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]))
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::fail(&format!("list open PRs page {page}"), response).await)
        }
    }
}

#[async_trait]
impl PullRequestSource for GitHubSource {
    async fn list_open_pull_requests(&mut self) -> Result<Vec<PullRequest>, EngineError> {
        // Page 1 carries the pagination metadata for the whole listing:
        // the Link header's rel="last" entry names the total page count.
        let first = self.fetch_page(1).await?;
        let last_page = first
            .headers()
            .get(header::LINK)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_last_page)
            .unwrap_or(1);

        let mut prs: Vec<PullRequest> = first.json().await?;

        for page in 2..=last_page {
            let response = self.fetch_page(page).await?;
            let mut batch: Vec<PullRequest> = response.json().await?;
            prs.append(&mut batch);
        }

        info!(
            open_prs = prs.len(),
            pages = last_page,
            "Listed open pull requests"
        );
        Ok(prs)
    }

    async fn get_labels(&mut self, pr: &PullRequest) -> Result<Vec<String>, EngineError> {
        if let Some(cached) = self.label_cache.get(&pr.number) {
            debug!(pr = pr.number, "Label cache hit");
            return Ok(cached.clone());
        }

        let url = self.repo_url(&format!("issues/{}/labels", pr.number));
        let response = self.send(self.http.get(&url)).await?;

        if !response.status().is_success() {
            return Err(Self::fail(&format!("get labels for PR #{}", pr.number), response).await);
        }

        let labels: Vec<String> = response
            .json::<Vec<GitHubLabel>>()
            .await?
            .into_iter()
            .map(|l| l.name)
            .collect();

        debug!(pr = pr.number, labels = ?labels, "Fetched labels");
        self.label_cache.insert(pr.number, labels.clone());
        Ok(labels)
    }

    async fn get_author_email(&mut self, pr: &PullRequest) -> Result<String, EngineError> {
        let response = self.send(self.http.get(&pr.patch_url)).await?;

        if !response.status().is_success() {
            return Err(Self::fail(&format!("get patch for PR #{}", pr.number), response).await);
        }

        let patch = response.text().await?;
        extract_author_email(&patch).ok_or(EngineError::EmailNotFound { number: pr.number })
    }

    async fn apply_label(&mut self, pr: &PullRequest, label: &str) -> Result<(), EngineError> {
        let url = self.repo_url(&format!("issues/{}/labels", pr.number));
        let body = serde_json::json!({ "labels": [label] });
        let response = self.send(self.http.post(&url).json(&body)).await?;

        if response.status().is_success() {
            info!(pr = pr.number, label = %label, "Applied label");
            Ok(())
        } else {
            Err(Self::fail(&format!("apply label to PR #{}", pr.number), response).await)
        }
    }

    async fn remove_label(&mut self, pr: &PullRequest, label: &str) -> Result<(), EngineError> {
        let url = self.repo_url(&format!(
            "issues/{}/labels/{}",
            pr.number,
            urlencoding::encode(label)
        ));
        let response = self.send(self.http.delete(&url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                // Label already absent; removal is idempotent.
                debug!(pr = pr.number, label = %label, "Label already absent");
                Ok(())
            }
            status if status.is_success() => {
                info!(pr = pr.number, label = %label, "Removed label");
                Ok(())
            }
            _ => Err(Self::fail(&format!("remove label from PR #{}", pr.number), response).await),
        }
    }

    async fn post_comment(&mut self, pr: &PullRequest, body: &str) -> Result<(), EngineError> {
        let url = self.repo_url(&format!("issues/{}/comments", pr.number));
        let payload = serde_json::json!({ "body": body });
        let response = self.send(self.http.post(&url).json(&payload)).await?;

        if response.status().is_success() {
            info!(pr = pr.number, "Posted comment");
            Ok(())
        } else {
            Err(Self::fail(&format!("post comment on PR #{}", pr.number), response).await)
        }
    }
}

/// Extract the total page count from a GitHub `Link` response header.
///
/// Returns the `page` query parameter of the `rel="last"` entry, or
/// `None` when the header has no such entry (single-page listing).
fn parse_last_page(link: &str) -> Option<u32> {
    let last = link
        .split(',')
        .find(|segment| segment.contains("rel=\"last\""))?;

    let url = last.trim().strip_prefix('<')?;
    let url = &url[..url.find('>')?];

    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Extract the author email from unified-diff patch text.
///
/// Only the first `From: Name <email>` header is consulted, which for a
/// multi-commit patch is the first commit's author line.
fn extract_author_email(patch: &str) -> Option<String> {
    for line in patch.lines() {
        let Some(rest) = line.strip_prefix("From:") else {
            continue;
        };

        if let (Some(open), Some(close)) = (rest.find('<'), rest.rfind('>')) {
            if open < close {
                let email = rest[open + 1..close].trim();
                if !email.is_empty() {
                    return Some(email.to_string());
                }
            }
        }

        // Bare-address form: "From: ada@example.com"
        let candidate = rest.trim();
        if candidate.contains('@') && !candidate.contains(char::is_whitespace) {
            return Some(candidate.to_string());
        }
    }
    None
}
