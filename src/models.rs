use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Podcast {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub author_name: String,
    pub image_url: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only populated by the single-podcast lookup.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<Vec<Episode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Episode {
    pub id: i64,
    pub external_id: String,
    pub podcast_id: i64,
    pub name: String,
    pub description: String,
    pub audio_url: String,
    pub image_url: String,
    /// ISO-8601 UTC, converted from upstream Unix seconds.
    pub date_published: String,
    /// Seconds, never negative.
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Podcast series as returned by the upstream directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamPodcast {
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamEpisode {
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio_url: String,
    /// Unix seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_published: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
}

impl UpstreamEpisode {
    /// `date_published` as an ISO-8601 UTC string, e.g. `2009-02-13T23:31:30Z`.
    pub fn published_iso8601(&self) -> String {
        unix_to_iso8601(self.date_published)
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration.max(0)
    }
}

/// Result of `getPodcastSeries`: the series plus its episodes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastWithEpisodes {
    #[serde(flatten)]
    pub podcast: UpstreamPodcast,
    #[serde(default, deserialize_with = "null_as_default")]
    pub episodes: Vec<UpstreamEpisode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub total_synced: u64,
    pub new: u64,
    pub message: String,
}

pub fn unix_to_iso8601(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// GraphQL nullable scalars and lists decode to their default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_seconds_convert_to_utc_iso8601() {
        assert_eq!(unix_to_iso8601(1234567890), "2009-02-13T23:31:30Z");
        assert_eq!(unix_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let ep: UpstreamEpisode = serde_json::from_value(serde_json::json!({
            "uuid": "ep-1",
            "duration": -5
        }))
        .unwrap();
        assert_eq!(ep.duration_secs(), 0);
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let p: UpstreamPodcast = serde_json::from_value(serde_json::json!({
            "uuid": "uuid-1",
            "name": "Show",
            "authorName": null,
            "imageUrl": null
        }))
        .unwrap();
        assert_eq!(p.author_name, "");
        assert_eq!(p.image_url, "");
        assert_eq!(p.description, "");
    }

    #[test]
    fn series_with_episodes_decodes_flattened() {
        let s: PodcastWithEpisodes = serde_json::from_value(serde_json::json!({
            "uuid": "uuid-1",
            "name": "Show",
            "episodes": [
                { "uuid": "ep-1", "name": "One", "audioUrl": "https://a/1.mp3", "datePublished": 1234567890, "duration": 100 }
            ]
        }))
        .unwrap();
        assert_eq!(s.podcast.uuid, "uuid-1");
        assert_eq!(s.episodes.len(), 1);
        assert_eq!(s.episodes[0].audio_url, "https://a/1.mp3");
        assert_eq!(s.episodes[0].published_iso8601(), "2009-02-13T23:31:30Z");
    }
}
