use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YouTube API key not set. Run `yt-sheets init` to configure.")]
    ApiKeyMissing,

    #[error("Google service account file not set. Run `yt-sheets init` to configure.")]
    ServiceAccountMissing,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Access denied to spreadsheet '{0}'. Share it with the service account email.")]
    AccessDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of [`Error`], for callers that only care about
/// which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or rejected API key / service account.
    Credentials,
    /// Transport failure or unexpected response from a Google API.
    Api,
    /// The target spreadsheet could not be found or opened.
    Spreadsheet,
    /// Bad user input, rejected before any network call.
    Input,
    /// Local configuration or filesystem problem.
    Local,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ApiKeyMissing | Error::ServiceAccountMissing | Error::InvalidCredentials(_) => {
                ErrorKind::Credentials
            }
            Error::Api { .. } | Error::Http(_) | Error::Json(_) => ErrorKind::Api,
            Error::SpreadsheetNotFound(_) | Error::AccessDenied(_) => ErrorKind::Spreadsheet,
            Error::InvalidInput(_) => ErrorKind::Input,
            Error::Config(_) | Error::Io(_) => ErrorKind::Local,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
