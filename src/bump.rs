//! # Bump Pull Request Enrichment
//!
//! Automated dependency-update pull requests carry a `[BUMP]` marker in
//! their title. This module builds the GitHub GraphQL search query that
//! counts how many of them were merged yesterday for one repository (and
//! optionally one sub-path), and fetches the count.
//!
//! The query text is part of the persisted-data contract with downstream
//! tooling and must be reproduced bit-exactly, including the trailing
//! space before the closing quote when the path term is empty.

use chrono::{Duration, NaiveDate, Utc};
use log::debug;
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};

/// GitHub GraphQL endpoint used by the default fetcher.
pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// The calendar day before the ambient current date, UTC.
pub fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(1)
}

/// Build the search document for merged `[BUMP]` pull requests of one
/// repository (`owner/name` form) on `yesterday`.
///
/// The merged-date window covers exactly that single day. The path term,
/// when non-empty, is appended in parentheses after the marker; when
/// empty, the parentheses are omitted and a single trailing space remains
/// before the closing quote.
pub fn build_search_query(repository: &str, path: &str, yesterday: NaiveDate) -> String {
    let day = yesterday.format("%Y-%m-%d");
    let path_term = if path.is_empty() {
        String::new()
    } else {
        format!("({})", path)
    };

    format!(
        "{{\n  search(query: \"repo:{repository} is:pr is:merged merged:{day}..{day} in:title [BUMP] {path_term}\", type: ISSUE, last: 100) {{\n    issueCount\n  }}\n}}"
    )
}

/// Derive the `owner/name` slug from a clone URL.
///
/// Handles `http(s)://host/owner/name(.git)` URLs as well as scp-style
/// `git@host:owner/name(.git)` remotes.
pub fn repository_slug(clone_url: &str) -> Result<String> {
    let path = match Url::parse(clone_url) {
        Ok(url) => url.path().trim_start_matches('/').to_string(),
        // scp-style remotes are not RFC URLs; take everything after `:`.
        Err(_) => match clone_url.split_once(':') {
            Some((_, path)) => path.trim_start_matches('/').to_string(),
            None => {
                return Err(Error::EnrichmentFetch {
                    repository: clone_url.to_string(),
                    message: "cannot derive owner/name from clone URL".to_string(),
                })
            }
        },
    };

    let slug = path.strip_suffix(".git").unwrap_or(&path);
    if slug.split('/').filter(|s| !s.is_empty()).count() < 2 {
        return Err(Error::EnrichmentFetch {
            repository: clone_url.to_string(),
            message: format!("clone URL path {:?} is not owner/name shaped", slug),
        });
    }
    Ok(slug.to_string())
}

/// Trait for the remote pull-request search - allows mocking in tests
pub trait PullRequestFetcher: Send + Sync {
    /// Execute `query` and return the count of matching pull requests.
    fn merged_bump_count(&self, repository: &str, query: &str) -> Result<u64>;
}

/// Default fetcher issuing a single GraphQL POST to GitHub.
pub struct GithubFetcher {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl GithubFetcher {
    pub fn new(token: String) -> Self {
        Self::with_endpoint(token, GITHUB_GRAPHQL_ENDPOINT.to_string())
    }

    /// Target a non-default endpoint. Used by tests against a local stub.
    pub fn with_endpoint(token: String, endpoint: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint,
            token,
        }
    }
}

impl PullRequestFetcher for GithubFetcher {
    fn merged_bump_count(&self, repository: &str, query: &str) -> Result<u64> {
        debug!("searching merged bump pull requests for {}", repository);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header("User-Agent", "drift-tracker")
            .json(&json!({ "query": query }))
            .send()
            .map_err(|e| Error::EnrichmentFetch {
                repository: repository.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::EnrichmentFetch {
                repository: repository.to_string(),
                message: format!("search endpoint returned {}", response.status()),
            });
        }

        let body: serde_json::Value = response.json().map_err(|e| Error::EnrichmentFetch {
            repository: repository.to_string(),
            message: format!("unparseable search response: {}", e),
        })?;

        body.pointer("/data/search/issueCount")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::EnrichmentFetch {
                repository: repository.to_string(),
                message: "search response is missing data.search.issueCount".to_string(),
            })
    }
}
