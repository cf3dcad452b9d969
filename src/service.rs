//! Catalog policy: read-through population of the local store and the
//! explicit sync operations.
//!
//! Upstream failures are handled in three ways:
//! - the implicit warm-up in [`CatalogService::get_podcasts`] degrades to the
//!   (empty) local state,
//! - a failed upsert inside a sync loop is logged and skipped,
//! - everything else is surfaced as a [`ServiceError`].

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ServiceError, UpstreamError};
use crate::models::{Podcast, SyncResult};
use crate::repository::PodcastRepository;
use crate::upstream::PodcastDirectory;

pub const PODCASTS_SYNCED: &str = "Podcasts synced successfully";

#[derive(Clone)]
pub struct CatalogService {
    directory: Arc<dyn PodcastDirectory>,
    repository: Arc<dyn PodcastRepository>,
}

impl CatalogService {
    pub fn new(directory: Arc<dyn PodcastDirectory>, repository: Arc<dyn PodcastRepository>) -> Self {
        Self { directory, repository }
    }

    /// Local podcasts; an empty store is filled from the popular list first.
    pub async fn get_podcasts(&self) -> Result<Vec<Podcast>, ServiceError> {
        let podcasts = self.repository.list_podcasts().await.map_err(database_error)?;
        if !podcasts.is_empty() {
            return Ok(podcasts);
        }

        let upstream = match self.directory.list_top_podcasts().await {
            Ok(list) => list,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "popular podcasts unavailable, serving empty catalog");
                return Ok(Vec::new());
            }
        };

        for podcast in &upstream {
            if let Err(e) = self.repository.upsert_podcast(podcast).await {
                warn!(uuid = %podcast.uuid, error = %e, "skipping podcast that failed to store");
            }
        }
        info!(count = upstream.len(), "catalog warmed from upstream");

        self.repository.list_podcasts().await.map_err(database_error)
    }

    /// One podcast with its episodes; episodes are fetched lazily on first access.
    pub async fn get_podcast_by_id(&self, id: &str) -> Result<Podcast, ServiceError> {
        let id = parse_id(id)?;

        let mut podcast = self.repository.get_podcast_by_id(id).await?;
        let episodes = self.repository.list_episodes(id).await.map_err(database_error)?;
        if !episodes.is_empty() {
            podcast.episodes = Some(episodes);
            return Ok(podcast);
        }

        // TODO: record a per-podcast last_synced_at so a series with no episodes
        // upstream is not re-fetched on every read.
        let series = self
            .directory
            .get_podcast(&podcast.external_id)
            .await
            .map_err(external_error)?;

        for episode in &series.episodes {
            if let Err(e) = self.repository.upsert_episode(episode, id).await {
                warn!(podcast_id = id, uuid = %episode.uuid, error = %e, "skipping episode that failed to store");
            }
        }

        podcast.episodes = Some(self.repository.list_episodes(id).await.map_err(database_error)?);
        Ok(podcast)
    }

    /// Refresh the catalog from the popular list.
    pub async fn sync_podcasts(&self) -> Result<SyncResult, ServiceError> {
        let upstream = self.directory.list_top_podcasts().await.map_err(external_error)?;

        let mut total_synced = 0;
        let mut new = 0;
        for podcast in &upstream {
            // Any lookup failure counts as "not present".
            let is_new = self.repository.get_podcast_by_external_id(&podcast.uuid).await.is_err();

            match self.repository.upsert_podcast(podcast).await {
                Ok(_) => {
                    total_synced += 1;
                    if is_new {
                        new += 1;
                    }
                }
                Err(e) => warn!(uuid = %podcast.uuid, error = %e, "skipping podcast that failed to store"),
            }
        }

        info!(total_synced, new, upstream = upstream.len(), "podcasts synced");
        Ok(SyncResult {
            total_synced,
            new,
            message: PODCASTS_SYNCED.to_string(),
        })
    }

    /// Refresh one podcast's episodes.
    pub async fn sync_podcast_episodes(&self, id: &str) -> Result<SyncResult, ServiceError> {
        let id = parse_id(id)?;

        let podcast = self.repository.get_podcast_by_id(id).await?;
        let series = self
            .directory
            .get_podcast(&podcast.external_id)
            .await
            .map_err(external_error)?;

        // One listing up front instead of one per upstream item; ids stored
        // during this loop are added so duplicates count once.
        let mut known: HashSet<String> = self
            .repository
            .list_episodes(id)
            .await
            .map_err(database_error)?
            .into_iter()
            .map(|e| e.external_id)
            .collect();

        let mut total_synced = 0;
        let mut new = 0;
        for episode in &series.episodes {
            let is_new = !known.contains(&episode.uuid);

            match self.repository.upsert_episode(episode, id).await {
                Ok(_) => {
                    total_synced += 1;
                    if is_new {
                        new += 1;
                        known.insert(episode.uuid.clone());
                    }
                }
                Err(e) => warn!(podcast_id = id, uuid = %episode.uuid, error = %e, "skipping episode that failed to store"),
            }
        }

        info!(podcast_id = id, uuid = %series.podcast.uuid, total_synced, new, "episodes synced");
        Ok(SyncResult {
            total_synced,
            new,
            message: PODCASTS_SYNCED.to_string(),
        })
    }
}

pub fn parse_id(raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::Validation(format!("podcast id '{raw}' is not an integer")))
}

fn database_error(e: crate::error::RepositoryError) -> ServiceError {
    ServiceError::Database(e.to_string())
}

fn external_error(e: UpstreamError) -> ServiceError {
    ServiceError::ExternalApi(e.to_string())
}
