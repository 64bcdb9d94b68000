use chat_provider::ProviderError;
use reqwest::StatusCode;

use crate::payload::ErrorBody;

/// Extracts the machine-readable error message from a non-success body,
/// falling back to the raw body and then the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.filter(|message| !message.trim().is_empty()) {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Maps a non-success status to the boundary failure taxonomy.
///
/// 401/403 mean the held credential was rejected; 4xx validation failures are
/// local caller mistakes; everything else is a transport/server failure.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = parse_error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::CredentialRejected(message)
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::Validation(message)
        }
        _ => ProviderError::Transport(format!("HTTP {}: {message}", status.as_u16())),
    }
}

pub fn transport_error(error: reqwest::Error) -> ProviderError {
    ProviderError::Transport(error.to_string())
}
