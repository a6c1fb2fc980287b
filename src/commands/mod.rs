pub mod init;
pub mod save;
pub mod search;

use chrono::Utc;

use crate::error::Result;
use crate::models::{DurationBucket, SearchFilter};

/// Search parameters as collected from the command line
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    pub days: u32,
    pub duration: DurationBucket,
    pub language: String,
    pub max_results: u32,
}

impl SearchOptions {
    pub fn to_filter(&self) -> Result<SearchFilter> {
        Ok(SearchFilter::new(self.query.trim())?
            .max_results(self.max_results)?
            .lookback_days(self.days, Utc::now())?
            .duration(self.duration)
            .language(self.language.as_str()))
    }
}
