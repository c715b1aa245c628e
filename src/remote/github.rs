// src/remote/github.rs

//! GitHub REST client
//!
//! Blocking wrapper around the v3 API for the handful of listings the
//! metadata adapter needs. No retries: a failed request fails the reindex
//! that issued it, and the caller may simply reindex again.

use super::{RemoteCommit, RemoteRelease, RemoteRepository};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Page size for fully paginated listings (API maximum)
const LIST_PAGE_SIZE: u32 = 100;

/// Safety stop for runaway pagination
const MAX_PAGES: u32 = 100;

#[derive(Debug, Deserialize)]
struct RepoDto {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct NamedDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseDto {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    prerelease: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommitDto {
    sha: String,
    html_url: String,
    commit: CommitDetailDto,
    #[serde(default)]
    author: Option<AccountDto>,
}

#[derive(Debug, Deserialize)]
struct CommitDetailDto {
    message: String,
    author: GitAuthorDto,
}

#[derive(Debug, Deserialize)]
struct GitAuthorDto {
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    login: String,
}

impl From<ReleaseDto> for RemoteRelease {
    fn from(dto: ReleaseDto) -> Self {
        let title = dto
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| dto.tag_name.clone());
        Self {
            title,
            tag: dto.tag_name,
            body: dto.body.unwrap_or_default(),
            prerelease: dto.prerelease,
            created_at: dto.created_at.timestamp(),
        }
    }
}

impl From<CommitDto> for RemoteCommit {
    fn from(dto: CommitDto) -> Self {
        Self {
            sha: dto.sha,
            message: dto.commit.message,
            html_url: dto.html_url,
            author_login: dto.author.map(|a| a.login),
            author_name: dto.commit.author.name,
            authored_at: dto.commit.author.date.timestamp(),
        }
    }
}

/// Authenticated client bound to one `org/repo`
pub struct GithubClient {
    client: Client,
    api_url: String,
    full_name: String,
    commits_per_page: u32,
}

impl GithubClient {
    /// Build a client and look the repository up
    ///
    /// Fails when the token is rejected, the repository does not exist in the
    /// organization, or the API is unreachable.
    pub fn connect(
        api_url: &str,
        org: &str,
        repo: &str,
        token: Option<&str>,
        timeout: Duration,
        commits_per_page: u32,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Config(format!("Invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("indexer/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::RemoteMetadata(format!("Failed to create HTTP client: {e}")))?;

        let mut this = Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            full_name: format!("{org}/{repo}"),
            commits_per_page,
        };

        let found: RepoDto = this.get_json(&format!("/repos/{org}/{repo}"), &[])?;
        info!("Connected to repository {}", found.full_name);
        this.full_name = found.full_name;
        Ok(this)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| Error::RemoteMetadata(format!("Failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::RemoteMetadata(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json()
            .map_err(|e| Error::RemoteMetadata(format!("Failed to decode {url}: {e}")))
    }

    /// Fetch every page of a listing endpoint
    fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        collect_pages(path, LIST_PAGE_SIZE, MAX_PAGES, |page| {
            self.get_json(
                path,
                &[
                    ("per_page", LIST_PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ],
            )
        })
    }

    fn repo_path(&self, endpoint: &str) -> String {
        format!("/repos/{}/{}", self.full_name, endpoint)
    }
}

/// Concatenate pages (1-based) until one comes back short
///
/// Ref listings decide what reconciliation deletes, so a listing still full
/// after `max_pages` is an error rather than a truncated result.
fn collect_pages<T>(
    what: &str,
    page_size: u32,
    max_pages: u32,
    mut fetch: impl FnMut(u32) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for page in 1..=max_pages {
        let batch = fetch(page)?;
        let done = batch.len() < page_size as usize;
        items.extend(batch);
        if done {
            return Ok(items);
        }
    }
    Err(Error::RemoteMetadata(format!(
        "Pagination limit reached for {what}: more than {} items",
        u64::from(page_size) * u64::from(max_pages)
    )))
}

impl RemoteRepository for GithubClient {
    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let tags: Vec<NamedDto> = self.get_all(&self.repo_path("tags"))?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    fn list_releases(&self) -> Result<Vec<RemoteRelease>> {
        let releases: Vec<ReleaseDto> = self.get_all(&self.repo_path("releases"))?;
        Ok(releases.into_iter().map(RemoteRelease::from).collect())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let branches: Vec<NamedDto> = self.get_all(&self.repo_path("branches"))?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    fn list_recent_commits(&self, branch: &str) -> Result<Vec<RemoteCommit>> {
        let commits: Vec<CommitDto> = self.get_json(
            &self.repo_path("commits"),
            &[
                ("sha", branch.to_string()),
                ("per_page", self.commits_per_page.to_string()),
            ],
        )?;
        Ok(commits.into_iter().map(RemoteCommit::from).collect())
    }
}
