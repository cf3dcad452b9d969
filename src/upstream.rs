//! GraphQL client for the upstream podcast directory.
//!
//! Requests go through [`HttpDoer`] so tests can swap the transport; the
//! directory operations themselves are exposed through [`PodcastDirectory`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::models::{PodcastWithEpisodes, UpstreamEpisode, UpstreamPodcast};

const HEADER_USER_ID: &str = "X-USER-ID";
const HEADER_API_KEY: &str = "X-API-KEY";

const POPULAR_CONTENT_QUERY: &str = "{ getPopularContent { popularityRankId podcastSeries { uuid name authorName imageUrl description } } }";

/// A single POST to the GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Executes one HTTP request. A returned error means no response was received.
#[async_trait]
pub trait HttpDoer: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply, UpstreamError>;
}

/// Default transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestDoer {
    client: reqwest::Client,
}

impl ReqwestDoer {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("podcast-catalog/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpDoer for ReqwestDoer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| UpstreamError::Transport(format!("invalid header name {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| UpstreamError::Transport(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

/// Read-only view of the upstream podcast directory.
#[async_trait]
pub trait PodcastDirectory: Send + Sync {
    /// Currently popular podcasts. May be empty.
    async fn list_top_podcasts(&self) -> Result<Vec<UpstreamPodcast>, UpstreamError>;

    /// One podcast series and its episodes.
    async fn get_podcast(&self, uuid: &str) -> Result<PodcastWithEpisodes, UpstreamError>;

    /// A single episode. `podcast_uuid` is only used for logging.
    async fn get_episode(&self, podcast_uuid: &str, episode_uuid: &str) -> Result<UpstreamEpisode, UpstreamError>;
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorItem>>,
}

#[derive(Deserialize)]
struct GraphQlErrorItem {
    message: String,
}

#[derive(Deserialize)]
struct PopularContentData {
    #[serde(rename = "getPopularContent")]
    popular: Option<PopularContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopularContent {
    #[allow(dead_code)]
    popularity_rank_id: Option<String>,
    #[serde(default)]
    podcast_series: Option<Vec<UpstreamPodcast>>,
}

#[derive(Deserialize)]
struct PodcastSeriesData {
    #[serde(rename = "getPodcastSeries")]
    series: Option<PodcastWithEpisodes>,
}

#[derive(Deserialize)]
struct PodcastEpisodeData {
    #[serde(rename = "getPodcastEpisode")]
    episode: Option<UpstreamEpisode>,
}

/// Client for the Taddy GraphQL API.
pub struct TaddyClient {
    http: Arc<dyn HttpDoer>,
    base_url: String,
    user_id: String,
    api_key: String,
}

impl TaddyClient {
    pub fn new(http: Arc<dyn HttpDoer>, base_url: impl Into<String>, user_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            user_id: user_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a reqwest-backed client from configuration.
    pub fn from_config(config: &UpstreamConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = ReqwestDoer::new(timeout)?;
        Ok(Self::new(
            Arc::new(http),
            config.url.clone(),
            config.user_id.clone().unwrap_or_default(),
            config.api_key.clone().unwrap_or_default(),
        ))
    }

    async fn query<T: DeserializeOwned>(&self, operation: &'static str, query: &str) -> Result<T, UpstreamError> {
        let result = self.execute(query).await;
        if let Err(ref e) = result {
            warn!(operation, kind = e.kind(), error = %e, "upstream request failed");
        }
        result
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str) -> Result<T, UpstreamError> {
        let body = serde_json::to_string(&GraphQlRequest { query, variables: None })
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let request = HttpRequest {
            url: self.base_url.clone(),
            headers: vec![
                (HEADER_USER_ID, self.user_id.clone()),
                (HEADER_API_KEY, self.api_key.clone()),
            ],
            body,
        };

        let reply = self.http.execute(request).await?;

        if reply.status != 200 {
            return Err(UpstreamError::Http {
                status: reply.status,
                body: reply.body,
            });
        }

        let response: GraphQlResponse<T> =
            serde_json::from_str(&reply.body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if let Some(errors) = response.errors.filter(|errs| !errs.is_empty()) {
            return Err(UpstreamError::GraphQl {
                errors: errors.into_iter().map(|e| e.message).collect(),
            });
        }

        response.data.ok_or(UpstreamError::MissingData("data"))
    }
}

#[async_trait]
impl PodcastDirectory for TaddyClient {
    async fn list_top_podcasts(&self) -> Result<Vec<UpstreamPodcast>, UpstreamError> {
        debug!("fetching popular podcasts");
        let data: PopularContentData = self.query("getPopularContent", POPULAR_CONTENT_QUERY).await?;
        let popular = data.popular.ok_or(UpstreamError::MissingData("getPopularContent"))?;
        Ok(popular.podcast_series.unwrap_or_default())
    }

    async fn get_podcast(&self, uuid: &str) -> Result<PodcastWithEpisodes, UpstreamError> {
        validate_uuid(uuid)?;
        debug!(uuid = %uuid, "fetching podcast series");

        let query = format!(
            "{{ getPodcastSeries(uuid: \"{uuid}\") {{ uuid name authorName imageUrl description \
             episodes {{ uuid name audioUrl datePublished duration imageUrl description }} }} }}"
        );
        let data: PodcastSeriesData = self.query("getPodcastSeries", &query).await?;
        data.series.ok_or(UpstreamError::MissingData("getPodcastSeries"))
    }

    async fn get_episode(&self, podcast_uuid: &str, episode_uuid: &str) -> Result<UpstreamEpisode, UpstreamError> {
        validate_uuid(episode_uuid)?;
        debug!(podcast_uuid = %podcast_uuid, episode_uuid = %episode_uuid, "fetching podcast episode");

        let query = format!(
            "{{ getPodcastEpisode(uuid: \"{episode_uuid}\") {{ uuid name audioUrl datePublished duration imageUrl description }} }}"
        );
        let data: PodcastEpisodeData = self.query("getPodcastEpisode", &query).await?;
        data.episode.ok_or(UpstreamError::MissingData("getPodcastEpisode"))
    }
}

/// UUIDs are inlined into query text, so only `[A-Za-z0-9-]` is accepted.
pub fn validate_uuid(uuid: &str) -> Result<(), UpstreamError> {
    if uuid.is_empty() || !uuid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(UpstreamError::InvalidUuid(uuid.to_string()));
    }
    Ok(())
}
