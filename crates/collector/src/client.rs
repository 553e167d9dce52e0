use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use common::config::{EventScope, GithubConfig};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::metrics;

const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match *self {
            GithubApiError::Http { status, .. } => status,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            GithubApiError::Http { endpoint, .. } => endpoint.as_str(),
        }
    }
}

/// Read-only access to the GitHub REST API. Records are returned as raw JSON
/// and handed to the normalizer unchanged.
#[async_trait]
pub trait GithubClient: Send + Sync {
    async fn list_public_events(&self, per_page: u32) -> Result<Vec<Value>>;
    async fn list_user_events(
        &self,
        username: &str,
        scope: EventScope,
        per_page: u32,
    ) -> Result<Vec<Value>>;
    async fn list_repo_events(&self, owner: &str, repo: &str, per_page: u32)
        -> Result<Vec<Value>>;
    async fn list_org_events(&self, org: &str, per_page: u32) -> Result<Vec<Value>>;
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Value>;
    async fn list_user_repos(&self, username: &str, per_page: u32) -> Result<Vec<Value>>;
    async fn get_user(&self, username: &str) -> Result<Value>;
}

pub struct RestGithubClient {
    http: reqwest::Client,
    base: Url,
}

impl RestGithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("token {}", token.trim()))
                .context("github token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building http client")?;

        // `Url::join` drops the last path segment unless the base ends in '/'.
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).with_context(|| format!("invalid api base {base}"))?;
        Ok(Self { http, base })
    }

    fn join(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn with_query(url: &mut Url, params: &[(&str, String)]) {
        let mut query_pairs = url.query_pairs_mut();
        for (key, val) in params {
            query_pairs.append_pair(key, val);
        }
    }

    fn page_params(per_page: u32) -> [(&'static str, String); 1] {
        [("per_page", per_page.clamp(1, MAX_PER_PAGE).to_string())]
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get_json(&self, op: &'static str, url: Url) -> Result<Value> {
        let endpoint = url.path().trim_start_matches('/').to_string();
        debug!(endpoint = %endpoint, "dispatching GitHub request");
        let start = Instant::now();
        let result = self.fetch(url, &endpoint).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::FETCH_REQUESTS_TOTAL
            .with_label_values(&[op, outcome])
            .inc();
        metrics::FETCH_LATENCY_SECONDS
            .with_label_values(&[op])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn fetch(&self, url: Url, endpoint: &str) -> Result<Value> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            let value: Value = response.json().await?;
            Ok(value)
        } else {
            Err(GithubApiError::status(status, endpoint).into())
        }
    }

    async fn get_json_array(&self, op: &'static str, url: Url) -> Result<Vec<Value>> {
        let value = self.get_json(op, url).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            _ => Err(anyhow!("expected array response from {op}")),
        }
    }
}

#[async_trait]
impl GithubClient for RestGithubClient {
    async fn list_public_events(&self, per_page: u32) -> Result<Vec<Value>> {
        let mut url = self.join("events")?;
        Self::with_query(&mut url, &Self::page_params(per_page));
        self.get_json_array("public_events", url).await
    }

    async fn list_user_events(
        &self,
        username: &str,
        scope: EventScope,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let path = match scope {
            EventScope::Public => format!("users/{username}/events/public"),
            EventScope::All => format!("users/{username}/events"),
            EventScope::Received => format!("users/{username}/received_events"),
            EventScope::ReceivedPublic => format!("users/{username}/received_events/public"),
        };
        let mut url = self.join(&path)?;
        Self::with_query(&mut url, &Self::page_params(per_page));
        self.get_json_array("user_events", url).await
    }

    async fn list_repo_events(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("repos/{owner}/{repo}/events"))?;
        Self::with_query(&mut url, &Self::page_params(per_page));
        self.get_json_array("repo_events", url).await
    }

    async fn list_org_events(&self, org: &str, per_page: u32) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("orgs/{org}/events"))?;
        Self::with_query(&mut url, &Self::page_params(per_page));
        self.get_json_array("org_events", url).await
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Value> {
        let url = self.join(&format!("repos/{owner}/{repo}"))?;
        self.get_json("repo", url).await
    }

    async fn list_user_repos(&self, username: &str, per_page: u32) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("users/{username}/repos"))?;
        let [per_page] = Self::page_params(per_page);
        Self::with_query(&mut url, &[("sort", "updated".to_string()), per_page]);
        self.get_json_array("user_repos", url).await
    }

    async fn get_user(&self, username: &str) -> Result<Value> {
        let url = self.join(&format!("users/{username}"))?;
        self.get_json("user", url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> RestGithubClient {
        RestGithubClient::new(&GithubConfig {
            api_base: api_base.to_string(),
            token: Some("secret".into()),
            ..GithubConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn join_keeps_base_path() {
        let client = client("https://ghe.example.com/api/v3");
        let url = client.join("users/octo/events/public").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/users/octo/events/public"
        );
    }

    #[test]
    fn per_page_is_clamped() {
        assert_eq!(RestGithubClient::page_params(500)[0].1, "100");
        assert_eq!(RestGithubClient::page_params(0)[0].1, "1");
        assert_eq!(RestGithubClient::page_params(30)[0].1, "30");
    }

    #[test]
    fn api_error_exposes_status_and_endpoint() {
        let err = GithubApiError::status(StatusCode::NOT_FOUND, "users/ghost");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.endpoint(), "users/ghost");
        assert_eq!(
            err.to_string(),
            "github api error: 404 Not Found for users/ghost"
        );
    }
}
