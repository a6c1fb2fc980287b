//! Response checking shared by the Google API clients.

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Standard Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

impl ErrorBody {
    /// Machine-readable codes: `errors[].reason`, `details[].reason` and `status`
    fn codes(&self) -> Vec<String> {
        let reasons = self.errors.iter().map(|e| e.reason.clone());
        let details = self
            .details
            .iter()
            .filter_map(|d| d.get("reason").and_then(|r| r.as_str()))
            .map(String::from);
        reasons
            .chain(details)
            .chain(std::iter::once(self.status.clone()))
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn is_invalid_key(codes: &[String]) -> bool {
    codes.iter().any(|c| c == "keyInvalid" || c == "API_KEY_INVALID")
}

/// Translate an error status and body into an [`Error`]
pub(crate) fn error_from_body(service: &'static str, status: StatusCode, body: &str) -> Error {
    error_from_body_with(service, status, body, |_, _| None)
}

/// Like [`error_from_body`], but `classify` gets the status and Google's
/// reason codes first and may pick a more specific error
pub(crate) fn error_from_body_with(
    service: &'static str,
    status: StatusCode,
    body: &str,
    classify: impl FnOnce(StatusCode, &[String]) -> Option<Error>,
) -> Error {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let message = match &parsed {
        Some(err) if !err.message.is_empty() => err.message.clone(),
        _ => body.trim().to_string(),
    };
    let codes = parsed.as_ref().map(ErrorBody::codes).unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED || is_invalid_key(&codes) {
        return Error::InvalidCredentials(format!("{}: {}", service, message));
    }

    if let Some(err) = classify(status, &codes) {
        return err;
    }

    Error::Api {
        service,
        status: status.as_u16(),
        message,
    }
}

/// Pass successful responses through, turn anything else into an [`Error`]
pub(crate) async fn ensure_success(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(error_from_body(service, status, &text))
}

pub(crate) async fn ensure_success_with(
    service: &'static str,
    response: Response,
    classify: impl FnOnce(StatusCode, &[String]) -> Option<Error>,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(error_from_body_with(service, status, &text, classify))
}
