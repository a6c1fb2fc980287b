use tracing::{debug, info};

use crate::error::Result;
use crate::models::{SearchFilter, VideoRecord};
use crate::youtube::SearchBackend;

/// Search, fetch details, filter by audio language, rank by views
pub struct VideoSearchPipeline<B> {
    backend: B,
}

impl<B: SearchBackend> VideoSearchPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Run one search. Any backend failure aborts the whole call.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<VideoRecord>> {
        let ids = self.backend.search_video_ids(filter).await?;
        if ids.is_empty() {
            info!(query = %filter.query, "search returned no videos");
            return Ok(Vec::new());
        }
        debug!(count = ids.len(), "fetching video details");

        let items = self.backend.video_details(&ids).await?;

        let mut videos = Vec::with_capacity(items.len());
        for item in items {
            if !filter.accepts_language(item.audio_language()) {
                debug!(
                    id = %item.id,
                    language = item.audio_language(),
                    "dropping video with non-matching audio language"
                );
                continue;
            }
            videos.push(item.into_record()?);
        }

        rank_by_views(&mut videos);
        info!(query = %filter.query, found = videos.len(), "search complete");
        Ok(videos)
    }
}

/// Most viewed first; equal counts keep their original order
pub fn rank_by_views(videos: &mut [VideoRecord]) {
    videos.sort_by(|a, b| b.view_count.cmp(&a.view_count));
}
