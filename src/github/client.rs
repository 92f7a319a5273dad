//! Minimal GitHub REST client.
//!
//! Only the three calls the aggregation needs: repository metadata, one page
//! of stargazers, and a user's profile location.

use crate::error::{Result, StarheatError};
use crate::models::{RepositoryInfo, Stargazer};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

/// The repository being aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub user: String,
    pub repository: String,
}

impl RepoTarget {
    pub fn new(user: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            repository: repository.into(),
        }
    }

    /// Parse `owner/name`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim().trim_end_matches(".git");
        let (user, repository) = spec.split_once('/')?;
        if user.is_empty() || repository.is_empty() || repository.contains('/') {
            return None;
        }
        Some(Self::new(user, repository))
    }
}

impl std::fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user, self.repository)
    }
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GitHubClient {
    http: Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self::with_client(http, &config.api_url))
    }

    pub fn with_client(http: Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// The underlying HTTP client, shared with other collaborators.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch repository metadata and its live stargazer count.
    pub async fn repository(&self, target: &RepoTarget) -> Result<RepositoryInfo> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_url, target.user, target.repository
        );
        debug!("GET {}", url);

        let response = check_status(self.http.get(&url).send().await?).await?;
        let payload: Value = response.json().await?;

        RepositoryInfo::from_payload(payload).ok_or_else(|| {
            StarheatError::InvalidResponse(format!("no stargazer count for {}", target))
        })
    }

    /// Fetch one page of stargazers (1-indexed).
    pub async fn stargazers_page(
        &self,
        target: &RepoTarget,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<Stargazer>> {
        let url = format!(
            "{}/repos/{}/{}/stargazers",
            self.api_url, target.user, target.repository
        );
        debug!("GET {} page={}", url, page);

        let response = self
            .http
            .get(&url)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Read the free-text location from a stargazer's profile.
    pub async fn user_location(&self, stargazer: &Stargazer) -> Result<Option<String>> {
        let url = if stargazer.profile_url.is_empty() {
            format!("{}/users/{}", self.api_url, stargazer.login)
        } else {
            stargazer.profile_url.clone()
        };
        debug!("GET {}", url);

        let response = check_status(self.http.get(&url).send().await?).await?;
        let profile: UserProfile = response.json().await?;

        Ok(profile
            .location
            .map(|location| location.trim().to_string())
            .filter(|location| !location.is_empty()))
    }
}

/// Turn a non-success response into [`StarheatError::Api`], keeping GitHub's
/// `message` when the body has one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(StarheatError::Api {
        status: status.as_u16(),
        message,
    })
}
