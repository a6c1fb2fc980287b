pub mod commands;
pub mod config;
pub mod error;
mod google;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod sheets;
pub mod youtube;

pub use error::{Error, ErrorKind, Result};
pub use models::{DurationBucket, SearchFilter, VideoRecord};
pub use pipeline::VideoSearchPipeline;
pub use publisher::{PublishReport, SheetPublisher};
