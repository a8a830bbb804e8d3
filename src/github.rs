//! GitHub releases client.
//!
//! Walks the paginated releases listing of the configured repository and
//! looks up single releases by tag.
//!
//! # Pagination
//!
//! ```text
//! page 1 ──> sort newest first ──> keep channel ──> page 2 ──> ... ──> empty page: stop
//! ```
//!
//! A page that fails to load (transport error, non-2xx status, body that
//! isn't a JSON array) counts as empty and ends the walk.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::branch::Channel;
use crate::config::{Config, RELEASES_PER_PAGE};
use crate::release::{select_for_channel, Release};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("bazzite-changelog/", env!("CARGO_PKG_VERSION"));

/// Errors from the releases API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request never got a response
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Failed to fetch {url}: {status}")]
    Status { url: String, status: StatusCode },

    /// Configured API base did not form a usable URL
    #[error("Invalid release URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Body was not the expected JSON
    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Client for the GitHub releases of one repository.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    config: Config,
    http: reqwest::Client,
}

impl ReleaseClient {
    /// Create a client for the repository named in `config`.
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch one page of releases, unsorted and unfiltered.
    ///
    /// Failures are logged and yield an empty page.
    pub async fn fetch_page(&self, page: u32) -> Vec<Release> {
        match self.try_fetch_page(page).await {
            Ok(releases) => releases,
            Err(e) => {
                warn!(page, error = %e, "release page unavailable, ending feed");
                Vec::new()
            }
        }
    }

    async fn try_fetch_page(&self, page: u32) -> Result<Vec<Release>, FetchError> {
        let url = format!(
            "{}?page={}&per_page={}",
            self.config.releases_url(),
            page,
            RELEASES_PER_PAGE
        );
        let body = self.get_json(&url).await?;

        let Value::Array(items) = body else {
            return Err(FetchError::Decode {
                url,
                message: "expected a JSON array of releases".to_string(),
            });
        };

        let releases = items
            .into_iter()
            .filter(|item| !item.is_null())
            .filter_map(|item| match serde_json::from_value::<Release>(item) {
                Ok(release) => Some(release),
                Err(e) => {
                    debug!(page, error = %e, "skipping malformed release entry");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(page, count = releases.len(), "fetched release page");
        Ok(releases)
    }

    /// Releases on `channel`, newest first within each page.
    ///
    /// Walks pages until one comes back empty, or until `limit` releases
    /// have been collected.
    pub async fn fetch_releases(&self, channel: Channel, limit: Option<usize>) -> Vec<Release> {
        let mut collected = Vec::new();
        let mut page = 1;

        loop {
            if limit.is_some_and(|l| collected.len() >= l) {
                break;
            }

            let releases = self.fetch_page(page).await;
            if releases.is_empty() {
                break;
            }
            collected.extend(select_for_channel(releases, channel));
            page += 1;
        }

        if let Some(limit) = limit {
            collected.truncate(limit);
        }

        info!(
            repo = %self.config.repo_slug(),
            %channel,
            count = collected.len(),
            "release feed loaded"
        );
        collected
    }

    /// Newest release on `channel`, if any.
    pub async fn fetch_latest(&self, channel: Channel) -> Option<Release> {
        self.fetch_releases(channel, Some(1)).await.into_iter().next()
    }

    /// Look up a single release by its tag.
    ///
    /// The tag is percent-encoded as one path segment.
    pub async fn fetch_release_by_tag(&self, tag: &str) -> Result<Release, FetchError> {
        let url = self.tag_url(tag)?;
        let body = self.get_json(&url).await?;

        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    fn tag_url(&self, tag: &str) -> Result<String, FetchError> {
        let base = self.config.releases_url();
        let invalid = |message: String| FetchError::InvalidUrl {
            url: base.clone(),
            message,
        };

        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot take path segments".to_string()))?
            .pop_if_empty()
            .push("tags")
            .push(tag);

        Ok(url.into())
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json::<Value>().await.map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::tests::release_json;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RELEASES_PATH: &str = "/repos/ublue-os/bazzite/releases";

    fn client_for(server: &MockServer) -> ReleaseClient {
        ReleaseClient::new(Config::default().with_api_base(&server.uri())).unwrap()
    }

    async fn mount_page(server: &MockServer, page: u32, body: Value) {
        Mock::given(method("GET"))
            .and(path(RELEASES_PATH))
            .and(query_param("page", page.to_string()))
            .and(query_param("per_page", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_feed_walks_pages_until_empty() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            json!([
                release_json(1, "41.1", false, "2025-01-01T00:00:00Z"),
                release_json(2, "41.2", true, "2025-01-02T00:00:00Z"),
                release_json(3, "41.3", false, "2025-01-03T00:00:00Z"),
            ]),
        )
        .await;
        mount_page(
            &server,
            2,
            json!([
                null,
                release_json(4, "40.9", false, "2024-12-20T00:00:00Z"),
            ]),
        )
        .await;
        mount_page(&server, 3, json!([])).await;

        let client = client_for(&server);

        let stable: Vec<u64> = client
            .fetch_releases(Channel::Stable, None)
            .await
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(stable, vec![3, 1, 4]);

        let testing: Vec<u64> = client
            .fetch_releases(Channel::Testing, None)
            .await
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(testing, vec![2]);
    }

    #[tokio::test]
    async fn test_limit_stops_paging_early() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            json!([
                release_json(1, "41.1", false, "2025-01-01T00:00:00Z"),
                release_json(2, "41.2", false, "2025-01-02T00:00:00Z"),
            ]),
        )
        .await;

        let client = client_for(&server);
        let releases = client.fetch_releases(Channel::Stable, Some(1)).await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, 2);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_ends_feed() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            json!([release_json(1, "41.1", false, "2025-01-01T00:00:00Z")]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(RELEASES_PATH))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let releases = client.fetch_releases(Channel::Stable, None).await;
        assert_eq!(releases.len(), 1);
    }

    #[tokio::test]
    async fn test_non_array_body_is_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"message": "Not Found"})).await;

        let client = client_for(&server);
        assert!(client.fetch_page(1).await.is_empty());
        assert!(client.fetch_latest(Channel::Stable).await.is_none());
    }

    #[tokio::test]
    async fn test_requests_github_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RELEASES_PATH))
            .and(header("accept", GITHUB_ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                release_json(9, "41.9", false, "2025-02-01T00:00:00Z")
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_page(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_release_by_tag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/tags/41.20250106.2", RELEASES_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(release_json(
                5,
                "41.20250106.2",
                false,
                "2025-01-06T00:00:00Z",
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let release = client.fetch_release_by_tag("41.20250106.2").await.unwrap();
        assert_eq!(release.id, 5);
        assert_eq!(release.notes(), "## Changes in 41.20250106.2");
    }

    #[tokio::test]
    async fn test_fetch_release_by_tag_escapes_tag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/tags/a%23b%3Fc%2Fd", RELEASES_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(release_json(
                6,
                "a#b?c/d",
                false,
                "2025-01-06T00:00:00Z",
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let release = client.fetch_release_by_tag("a#b?c/d").await.unwrap();
        assert_eq!(release.tag_name, "a#b?c/d");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query().is_none());
    }

    #[test]
    fn test_tag_url_keeps_plain_tags() {
        let client = ReleaseClient::new(Config::default()).unwrap();
        assert_eq!(
            client.tag_url("41.20250106.2").unwrap(),
            "https://api.github.com/repos/ublue-os/bazzite/releases/tags/41.20250106.2"
        );
    }

    #[tokio::test]
    async fn test_fetch_release_by_tag_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/tags/nope", RELEASES_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_release_by_tag("nope").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }
}
