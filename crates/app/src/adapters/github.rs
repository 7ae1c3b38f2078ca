//! GitHub REST client over blocking `reqwest`.

use anyhow::{bail, Context, Result};
use repodeck_core::cancel::CancelToken;
use repodeck_core::domain::{ProviderType, Repository};
use repodeck_core::ports::{ClientFactory, RepositoryClient};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, LINK};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("repodeck/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: u32 = 100;
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

#[derive(Debug, Deserialize)]
struct ApiRepository {
    id: u64,
    name: String,
    owner: Option<ApiAccount>,
    organization: Option<ApiAccount>,
    description: Option<String>,
    html_url: String,
    clone_url: String,
    ssh_url: String,
    #[serde(default)]
    fork: bool,
    parent: Option<ApiParent>,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiParent {
    html_url: String,
}

impl From<ApiRepository> for Repository {
    fn from(api: ApiRepository) -> Self {
        let owner = api
            .owner
            .or(api.organization)
            .map(|account| account.login)
            .unwrap_or_default();

        let fork_url = match (api.fork, api.parent) {
            (true, Some(parent)) => parent.html_url,
            (true, None) => {
                // list endpoints omit the parent; only get_one carries it
                debug!(repo = %api.html_url, "forked repository has no parent");
                String::new()
            }
            (false, _) => String::new(),
        };

        Repository {
            remote_id: api.id.to_string(),
            name: api.name,
            owner,
            description: api.description.unwrap_or_default(),
            html_url: api.html_url,
            clone_url: api.clone_url,
            clone_ssh_url: api.ssh_url,
            is_fork: api.fork,
            fork_url,
        }
    }
}

/// The `rel="next"` target of a `Link` header, if any
pub fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';').map(str::trim);
        let target = parts.next()?.strip_prefix('<')?.strip_suffix('>')?;
        parts
            .any(|param| param == "rel=\"next\"")
            .then(|| target.to_string())
    })
}

pub struct GithubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, API_BASE_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Some(token.to_string()).filter(|token| !token.is_empty()),
        })
    }

    fn get(&self, url: &str, accept: &str) -> RequestBuilder {
        let request = self.http.get(url).header(ACCEPT, accept);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Every repository the token can see, or the user's public ones without a token
    fn list_url(&self, username: &str) -> String {
        match self.token {
            Some(_) => format!("{}/user/repos?type=all&per_page={PER_PAGE}", self.base_url),
            None => format!("{}/users/{username}/repos?type=all&per_page={PER_PAGE}", self.base_url),
        }
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .with_context(|| format!("request for {what} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("GitHub returned {status} for {what}: {}", body.trim());
        }
        Ok(response)
    }
}

impl RepositoryClient for GithubClient {
    fn list_repositories_for_user(&self, username: &str, cancel: &CancelToken) -> Result<Vec<Repository>> {
        let mut repos = Vec::new();
        let mut next = Some(self.list_url(username));
        let mut page = 0;

        while let Some(url) = next.take() {
            if cancel.is_cancelled() {
                bail!("listing repositories for {username} was cancelled");
            }
            page += 1;

            let response = self.send(self.get(&url, JSON_MEDIA_TYPE), &format!("repositories of {username}"))?;
            next = response
                .headers()
                .get(LINK)
                .and_then(|link| link.to_str().ok())
                .and_then(next_page_url);

            let batch: Vec<ApiRepository> = response
                .json()
                .with_context(|| format!("invalid repository page {page} for {username}"))?;
            repos.extend(batch.into_iter().map(Repository::from));
        }

        debug!(username, count = repos.len(), pages = page, "found repositories");
        Ok(repos)
    }

    fn get_one(&self, username: &str, name: &str) -> Result<Repository> {
        let url = format!("{}/repos/{username}/{name}", self.base_url);
        let api: ApiRepository = self
            .send(self.get(&url, JSON_MEDIA_TYPE), &format!("{username}/{name}"))?
            .json()
            .with_context(|| format!("invalid repository {username}/{name}"))?;
        Ok(api.into())
    }

    fn get_readme(&self, username: &str, name: &str) -> Result<String> {
        let url = format!("{}/repos/{username}/{name}/readme", self.base_url);
        let response = self
            .get(&url, RAW_MEDIA_TYPE)
            .send()
            .with_context(|| format!("request for readme of {username}/{name} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(username, name, "repository has no readme");
            return Ok(String::new());
        }
        if !response.status().is_success() {
            bail!("GitHub returned {} for readme of {username}/{name}", response.status());
        }

        response
            .text()
            .with_context(|| format!("invalid readme for {username}/{name}"))
    }
}

/// Maps provider types to HTTP clients
#[derive(Debug, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build(&self, provider: ProviderType, credential: &str) -> Result<Arc<dyn RepositoryClient>> {
        match provider {
            ProviderType::GitHub => Ok(Arc::new(GithubClient::new(credential)?)),
        }
    }
}
