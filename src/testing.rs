//! Test doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::models::{PodcastWithEpisodes, UpstreamEpisode, UpstreamPodcast};
use crate::upstream::{HttpDoer, HttpReply, HttpRequest, PodcastDirectory};

pub fn upstream_podcast(uuid: &str) -> UpstreamPodcast {
    UpstreamPodcast {
        uuid: uuid.to_string(),
        name: format!("Podcast {uuid}"),
        author_name: "Author".to_string(),
        image_url: format!("https://img.test/{uuid}.png"),
        description: "A show".to_string(),
    }
}

pub fn upstream_episode(uuid: &str, date_published: i64, duration: i64) -> UpstreamEpisode {
    UpstreamEpisode {
        uuid: uuid.to_string(),
        name: format!("Episode {uuid}"),
        description: String::new(),
        audio_url: format!("https://audio.test/{uuid}.mp3"),
        date_published,
        duration,
        image_url: String::new(),
    }
}

/// Transport double returning one canned reply for every request.
pub struct MockHttpDoer {
    reply: Result<HttpReply, String>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpDoer {
    pub fn reply(status: u16, body: &str) -> Self {
        Self {
            reply: Ok(HttpReply {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::reply(200, &body.to_string())
    }

    pub fn transport_error(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpDoer for MockHttpDoer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply, UpstreamError> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone().map_err(UpstreamError::Transport)
    }
}

/// A recorded directory call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    ListTop,
    GetPodcast(String),
    GetEpisode(String, String),
}

/// In-memory directory with call recording and failure injection.
#[derive(Default)]
pub struct MockDirectory {
    top: Mutex<Vec<UpstreamPodcast>>,
    series: Mutex<HashMap<String, Vec<UpstreamEpisode>>>,
    fail: Mutex<bool>,
    calls: Mutex<Vec<DirectoryCall>>,
}

impl MockDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_top(&self, podcasts: Vec<UpstreamPodcast>) {
        *self.top.lock().unwrap() = podcasts;
    }

    pub fn set_episodes(&self, uuid: &str, episodes: Vec<UpstreamEpisode>) {
        self.series.lock().unwrap().insert(uuid.to_string(), episodes);
    }

    /// Every subsequent call fails as if the upstream answered HTTP 500.
    pub fn fail_with_http_500(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: DirectoryCall) -> Result<(), UpstreamError> {
        self.calls.lock().unwrap().push(call);
        if *self.fail.lock().unwrap() {
            return Err(UpstreamError::Http {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PodcastDirectory for MockDirectory {
    async fn list_top_podcasts(&self) -> Result<Vec<UpstreamPodcast>, UpstreamError> {
        self.record(DirectoryCall::ListTop)?;
        Ok(self.top.lock().unwrap().clone())
    }

    async fn get_podcast(&self, uuid: &str) -> Result<PodcastWithEpisodes, UpstreamError> {
        self.record(DirectoryCall::GetPodcast(uuid.to_string()))?;
        let episodes = self
            .series
            .lock()
            .unwrap()
            .get(uuid)
            .cloned()
            .ok_or(UpstreamError::MissingData("getPodcastSeries"))?;
        Ok(PodcastWithEpisodes {
            podcast: upstream_podcast(uuid),
            episodes,
        })
    }

    async fn get_episode(&self, podcast_uuid: &str, episode_uuid: &str) -> Result<UpstreamEpisode, UpstreamError> {
        self.record(DirectoryCall::GetEpisode(podcast_uuid.to_string(), episode_uuid.to_string()))?;
        self.series
            .lock()
            .unwrap()
            .get(podcast_uuid)
            .and_then(|eps| eps.iter().find(|e| e.uuid == episode_uuid).cloned())
            .ok_or(UpstreamError::MissingData("getPodcastEpisode"))
    }
}
