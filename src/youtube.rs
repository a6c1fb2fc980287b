use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::DEFAULT_YOUTUBE_BASE_URL;
use crate::error::{Error, Result};
use crate::google::ensure_success;
use crate::models::{SearchFilter, VideoRecord};

const SERVICE: &str = "YouTube";

/// The two YouTube Data API calls the search pipeline needs
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// `search.list` restricted to videos; returns video ids in API order
    async fn search_video_ids(&self, filter: &SearchFilter) -> Result<Vec<String>>;

    /// One batched `videos.list` call with snippet and statistics
    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoItem>>;
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

/// Raw `videos.list` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    pub default_audio_language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(rename = "default")]
    pub default_res: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Counts arrive as decimal strings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
}

impl VideoItem {
    pub fn audio_language(&self) -> &str {
        self.snippet.default_audio_language.as_deref().unwrap_or("")
    }

    /// Missing view count counts as zero views
    pub fn view_count(&self) -> Result<u64> {
        match self.statistics.view_count.as_deref() {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| Error::Api {
                service: SERVICE,
                status: 200,
                message: format!("invalid viewCount '{}' for video {}", raw, self.id),
            }),
        }
    }

    pub fn into_record(self) -> Result<VideoRecord> {
        let view_count = self.view_count()?;
        let audio_language = self.audio_language().to_string();
        let Thumbnails {
            default_res,
            medium,
            high,
        } = self.snippet.thumbnails;
        let thumbnail_url = high
            .or(medium)
            .or(default_res)
            .map(|t| t.url)
            .unwrap_or_default();

        Ok(VideoRecord {
            video_url: VideoRecord::watch_url(&self.id),
            id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnail_url,
            view_count,
            published_at: self.snippet.published_at,
            audio_language,
        })
    }
}

/// YouTube Data API v3 client authenticated with an API key
pub struct YouTubeApi {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeApi {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::ApiKeyMissing);
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
        })
    }

    /// Point the client at another server, e.g. a local API mock
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, ?params, "YouTube request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        let response = ensure_success(SERVICE, response).await?;
        Ok(response.json().await?)
    }
}

/// Query parameters for `search.list`, without the key
pub fn search_params(filter: &SearchFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("part", "id".to_string()),
        ("q", filter.query.clone()),
        ("type", "video".to_string()),
        ("maxResults", filter.max_results.to_string()),
        ("videoDuration", filter.duration.as_str().to_string()),
    ];
    if !filter.language.is_empty() {
        params.push(("relevanceLanguage", filter.language.clone()));
    }
    if let Some(after) = filter.published_after_param() {
        params.push(("publishedAfter", after));
    }
    params
}

/// Query parameters for `videos.list`: the parts to fetch and the ids, nothing else
pub fn details_params(ids: &[String]) -> Vec<(&'static str, String)> {
    vec![
        ("part", "snippet,statistics".to_string()),
        ("id", ids.join(",")),
    ]
}

#[async_trait]
impl SearchBackend for YouTubeApi {
    async fn search_video_ids(&self, filter: &SearchFilter) -> Result<Vec<String>> {
        let response: SearchListResponse = self.get("search", &search_params(filter)).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect())
    }

    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoItem>> {
        let response: VideoListResponse = self.get("videos", &details_params(ids)).await?;
        Ok(response.items)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::DurationBucket;

    const VIDEO_JSON: &str = r#"{
        "kind": "youtube#videoListResponse",
        "items": [
            {
                "id": "abc123",
                "snippet": {
                    "publishedAt": "2024-04-29T10:00:00Z",
                    "title": "Rust em produção",
                    "description": "Uma palestra",
                    "thumbnails": {
                        "default": {"url": "https://i.ytimg.com/vi/abc123/default.jpg"},
                        "high": {"url": "https://i.ytimg.com/vi/abc123/hqdefault.jpg"}
                    },
                    "defaultAudioLanguage": "pt-BR"
                },
                "statistics": {"viewCount": "15230", "likeCount": "12"}
            },
            {
                "id": "nostats",
                "snippet": {
                    "publishedAt": "2024-04-30T08:00:00Z",
                    "title": "Sem estatísticas",
                    "description": "",
                    "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/nostats/mqdefault.jpg"}}
                },
                "statistics": {}
            }
        ]
    }"#;

    #[test]
    fn video_items_convert_to_records() {
        let response: VideoListResponse = serde_json::from_str(VIDEO_JSON).unwrap();
        let mut records = response
            .items
            .into_iter()
            .map(VideoItem::into_record)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        let second = records.pop().unwrap();
        let first = records.pop().unwrap();

        assert_eq!(first.id, "abc123");
        assert_eq!(first.view_count, 15230);
        assert_eq!(first.audio_language, "pt-BR");
        assert_eq!(first.thumbnail_url, "https://i.ytimg.com/vi/abc123/hqdefault.jpg");
        assert_eq!(first.video_url, "https://www.youtube.com/watch?v=abc123");

        assert_eq!(second.view_count, 0);
        assert_eq!(second.audio_language, "");
        assert_eq!(second.thumbnail_url, "https://i.ytimg.com/vi/nostats/mqdefault.jpg");
    }

    #[test]
    fn garbage_view_count_is_an_error() {
        let item = VideoItem {
            id: "x".into(),
            statistics: VideoStatistics {
                view_count: Some("lots".into()),
            },
            ..Default::default()
        };
        assert!(item.into_record().is_err());
    }

    #[test]
    fn search_response_skips_non_video_ids() {
        let json = r#"{"items":[
            {"id":{"kind":"youtube#video","videoId":"a"}},
            {"id":{"kind":"youtube#channel","channelId":"c"}},
            {"id":{"kind":"youtube#video","videoId":"b"}}
        ]}"#;
        let response: SearchListResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = response
            .items
            .into_iter()
            .filter_map(|i| i.id.video_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn details_params_send_only_part_and_ids() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            details_params(&ids),
            vec![
                ("part", "snippet,statistics".to_string()),
                ("id", "a,b".to_string()),
            ]
        );
    }

    #[test]
    fn search_params_include_optional_filters() {
        let filter = SearchFilter::new("rust async")
            .unwrap()
            .max_results(20)
            .unwrap()
            .published_after(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
            .duration(DurationBucket::Long)
            .language("pt");

        let params = search_params(&filter);
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("part"), Some("id"));
        assert_eq!(get("type"), Some("video"));
        assert_eq!(get("q"), Some("rust async"));
        assert_eq!(get("maxResults"), Some("20"));
        assert_eq!(get("videoDuration"), Some("long"));
        assert_eq!(get("relevanceLanguage"), Some("pt"));
        assert_eq!(get("publishedAfter"), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn search_params_omit_unset_filters() {
        let filter = SearchFilter::new("rust").unwrap();
        let params = search_params(&filter);
        assert!(params.iter().all(|(k, _)| *k != "publishedAfter"));
        assert!(params.iter().all(|(k, _)| *k != "relevanceLanguage"));
        assert!(params.contains(&("videoDuration", "any".to_string())));
    }

    #[test]
    fn blank_api_key_is_missing() {
        assert!(matches!(YouTubeApi::new("  "), Err(Error::ApiKeyMissing)));
    }
}
