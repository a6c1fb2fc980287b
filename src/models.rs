use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest page the search endpoint returns in one call
pub const MAX_RESULTS_LIMIT: u32 = 50;
pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const MAX_LOOKBACK_DAYS: u32 = 90;

/// A video found by the search pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub view_count: u64,
    pub published_at: String,
    pub audio_language: String,
}

impl VideoRecord {
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }
}

/// Coarse video length filter understood by the search endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationBucket {
    #[default]
    Any,
    /// 4 to 20 minutes
    Medium,
    /// Longer than 20 minutes
    Long,
}

impl DurationBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Any => "any",
            DurationBucket::Medium => "medium",
            DurationBucket::Long => "long",
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(DurationBucket::Any),
            "medium" => Ok(DurationBucket::Medium),
            "long" => Ok(DurationBucket::Long),
            other => Err(format!(
                "unknown duration '{}' (expected any, medium or long)",
                other
            )),
        }
    }
}

/// Parameters for one pipeline run
#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub query: String,
    pub max_results: u32,
    pub published_after: Option<DateTime<Utc>>,
    pub duration: DurationBucket,
    /// Audio language prefix such as "pt" or "en". Empty disables the post-filter.
    pub language: String,
}

impl SearchFilter {
    pub fn new(query: impl Into<String>) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("search query must not be empty".to_string()));
        }
        Ok(Self {
            query,
            max_results: DEFAULT_MAX_RESULTS,
            published_after: None,
            duration: DurationBucket::Any,
            language: String::new(),
        })
    }

    pub fn max_results(mut self, max_results: u32) -> Result<Self> {
        if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
            return Err(Error::InvalidInput(format!(
                "max results must be between 1 and {}",
                MAX_RESULTS_LIMIT
            )));
        }
        self.max_results = max_results;
        Ok(self)
    }

    pub fn published_after(mut self, at: DateTime<Utc>) -> Self {
        self.published_after = Some(at);
        self
    }

    /// Only keep videos published in the last `days` days, counted from `now`
    pub fn lookback_days(self, days: u32, now: DateTime<Utc>) -> Result<Self> {
        if days == 0 || days > MAX_LOOKBACK_DAYS {
            return Err(Error::InvalidInput(format!(
                "lookback must be between 1 and {} days",
                MAX_LOOKBACK_DAYS
            )));
        }
        Ok(self.published_after(now - Duration::days(i64::from(days))))
    }

    pub fn duration(mut self, duration: DurationBucket) -> Self {
        self.duration = duration;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into().trim().to_string();
        self
    }

    /// `publishedAfter` as the API expects it, second precision UTC
    pub fn published_after_param(&self) -> Option<String> {
        self.published_after
            .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// Whether a video with the given default audio language passes the post-filter
    pub fn accepts_language(&self, audio_language: &str) -> bool {
        self.language.is_empty() || audio_language.starts_with(&self.language)
    }
}
