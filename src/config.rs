use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::{Error, Result};

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Get the base data directory (~/.yt-sheets/)
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        std::env::var("YT_SHEETS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".yt-sheets")
            })
    })
}

/// Get the .env file path
pub fn env_file_path() -> PathBuf {
    data_dir().join(".env")
}

/// Load environment variables from the data directory's .env file
pub fn load_env() {
    let env_path = env_file_path();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    } else {
        // Try current directory as fallback
        let _ = dotenvy::dotenv();
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the YouTube Data API key
pub fn youtube_api_key() -> Result<String> {
    non_empty_var("YOUTUBE_API_KEY").ok_or(Error::ApiKeyMissing)
}

/// Base URL of the YouTube Data API, overridable to target a mock server
pub fn youtube_base_url() -> String {
    non_empty_var("YOUTUBE_API_BASE_URL").unwrap_or_else(|| DEFAULT_YOUTUBE_BASE_URL.to_string())
}

/// Path to the Google service account JSON key
pub fn service_account_path() -> Result<PathBuf> {
    let path = non_empty_var("GOOGLE_SERVICE_ACCOUNT_FILE")
        .or_else(|| non_empty_var("GOOGLE_APPLICATION_CREDENTIALS"))
        .map(PathBuf::from)
        .ok_or(Error::ServiceAccountMissing)?;

    if !path.exists() {
        return Err(Error::Config(format!(
            "Service account file does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Create the data directory if it doesn't exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(data_dir())?;
    Ok(())
}
