use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::RepositoryError;
use crate::models::{Episode, Podcast, UpstreamEpisode, UpstreamPodcast};

/// All podcast columns in SELECT order (must match Podcast struct field order).
const PODCAST_COLUMNS: &str = "id, external_id, name, author_name, image_url, description, created_at, updated_at";

/// All episode columns in SELECT order (must match Episode struct field order).
const EPISODE_COLUMNS: &str = "id, external_id, podcast_id, name, description, audio_url, image_url,
    date_published, duration, created_at, updated_at";

/// Typed access to the mirrored catalog.
///
/// Lookups report a missing row as [`RepositoryError::NotFound`]; callers rely
/// on that to tell new podcasts from known ones.
#[async_trait]
pub trait PodcastRepository: Send + Sync {
    /// All podcasts, newest first.
    async fn list_podcasts(&self) -> Result<Vec<Podcast>, RepositoryError>;

    async fn get_podcast_by_id(&self, id: i64) -> Result<Podcast, RepositoryError>;

    async fn get_podcast_by_external_id(&self, external_id: &str) -> Result<Podcast, RepositoryError>;

    /// Insert or merge by `external_id`. `id` and `created_at` survive a merge.
    async fn upsert_podcast(&self, podcast: &UpstreamPodcast) -> Result<Podcast, RepositoryError>;

    /// Episodes of one podcast, most recently published first.
    async fn list_episodes(&self, podcast_id: i64) -> Result<Vec<Episode>, RepositoryError>;

    /// Insert or merge by `(podcast_id, external_id)`.
    async fn upsert_episode(&self, episode: &UpstreamEpisode, podcast_id: i64) -> Result<Episode, RepositoryError>;
}

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PodcastRepository for SqliteRepository {
    async fn list_podcasts(&self) -> Result<Vec<Podcast>, RepositoryError> {
        let query = format!("SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY created_at DESC, id DESC");
        let podcasts = sqlx::query_as::<_, Podcast>(&query).fetch_all(&self.pool).await?;
        Ok(podcasts)
    }

    async fn get_podcast_by_id(&self, id: i64) -> Result<Podcast, RepositoryError> {
        let query = format!("SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = ?");
        sqlx::query_as::<_, Podcast>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_podcast_by_external_id(&self, external_id: &str) -> Result<Podcast, RepositoryError> {
        let query = format!("SELECT {PODCAST_COLUMNS} FROM podcasts WHERE external_id = ?");
        sqlx::query_as::<_, Podcast>(&query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn upsert_podcast(&self, podcast: &UpstreamPodcast) -> Result<Podcast, RepositoryError> {
        let query = format!(
            "INSERT INTO podcasts (external_id, name, author_name, image_url, description)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(external_id) DO UPDATE SET
               name = excluded.name,
               author_name = excluded.author_name,
               image_url = excluded.image_url,
               description = excluded.description,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             RETURNING {PODCAST_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Podcast>(&query)
            .bind(&podcast.uuid)
            .bind(&podcast.name)
            .bind(&podcast.author_name)
            .bind(&podcast.image_url)
            .bind(&podcast.description)
            .fetch_one(&self.pool)
            .await?;

        debug!(uuid = %podcast.uuid, id = row.id, "upserted podcast");
        Ok(row)
    }

    async fn list_episodes(&self, podcast_id: i64) -> Result<Vec<Episode>, RepositoryError> {
        let query = format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE podcast_id = ? ORDER BY date_published DESC, id DESC"
        );
        let episodes = sqlx::query_as::<_, Episode>(&query)
            .bind(podcast_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(episodes)
    }

    async fn upsert_episode(&self, episode: &UpstreamEpisode, podcast_id: i64) -> Result<Episode, RepositoryError> {
        let query = format!(
            "INSERT INTO episodes (external_id, podcast_id, name, description, audio_url, image_url, date_published, duration)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(external_id) DO UPDATE SET
               podcast_id = excluded.podcast_id,
               name = excluded.name,
               description = excluded.description,
               audio_url = excluded.audio_url,
               image_url = excluded.image_url,
               date_published = excluded.date_published,
               duration = excluded.duration,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             RETURNING {EPISODE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Episode>(&query)
            .bind(&episode.uuid)
            .bind(podcast_id)
            .bind(&episode.name)
            .bind(&episode.description)
            .bind(&episode.audio_url)
            .bind(&episode.image_url)
            .bind(episode.published_iso8601())
            .bind(episode.duration_secs())
            .fetch_one(&self.pool)
            .await?;

        debug!(uuid = %episode.uuid, podcast_id, id = row.id, "upserted episode");
        Ok(row)
    }
}
